//! Mock LLM for tests.
//!
//! Plays back a scripted queue of responses, one per call, and records every
//! prompt it received so tests can assert on what a node sent.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, ToolCall, ToolSpec};
use crate::message::Message;

/// One recorded model call.
#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
}

/// Scripted LLM: returns queued responses in order.
///
/// Running out of script is an `ExecutionFailed` error, so a test that makes more
/// model calls than it scripted fails loudly.
///
/// **Interaction**: Implements `LlmClient`; shared by all nodes of a test graph.
#[derive(Default)]
pub struct MockLlm {
    script: Mutex<VecDeque<Result<LlmResponse, String>>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockLlm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a plain-text response.
    pub fn with_text(self, content: impl Into<String>) -> Self {
        self.push(Ok(LlmResponse {
            content: content.into(),
            ..Default::default()
        }))
    }

    /// Queues a response carrying one native tool call.
    pub fn with_tool_call(
        self,
        name: impl Into<String>,
        arguments: serde_json::Value,
        id: impl Into<String>,
    ) -> Self {
        self.push(Ok(LlmResponse {
            content: String::new(),
            tool_calls: vec![ToolCall {
                name: name.into(),
                arguments: arguments.to_string(),
                id: Some(id.into()),
            }],
            usage: None,
        }))
    }

    /// Queues a response with several native tool calls.
    pub fn with_tool_calls(self, tool_calls: Vec<ToolCall>) -> Self {
        self.push(Ok(LlmResponse {
            tool_calls,
            ..Default::default()
        }))
    }

    /// Queues a model failure.
    pub fn with_error(self, message: impl Into<String>) -> Self {
        self.push(Err(message.into()))
    }

    fn push(self, item: Result<LlmResponse, String>) -> Self {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(item);
        }
        self
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Responses not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                messages: messages.to_vec(),
                tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            });
        }
        let next = self
            .script
            .lock()
            .map_err(|_| AgentError::ExecutionFailed("mock script poisoned".into()))?
            .pop_front();
        match next {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(AgentError::ExecutionFailed(message)),
            None => Err(AgentError::ExecutionFailed(
                "mock llm script exhausted".into(),
            )),
        }
    }
}
