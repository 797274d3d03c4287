//! OpenAI Chat Completions client implementing `LlmClient` (ChatOpenAI).
//!
//! Requests are sent with temperature 0 and streaming enabled (`create_stream`).
//! Content deltas and tool-call deltas are accumulated into one `LlmResponse`;
//! tool-call fragments are keyed by their stream index.
//!
//! Uses `OPENAI_API_KEY` / `OPENAI_BASE_URL` from the environment by default, or
//! an explicit `OpenAIConfig` via [`ChatOpenAI::with_config`].

use std::collections::BTreeMap;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, ChatCompletionTool, ChatCompletionTools,
        CreateChatCompletionRequestArgs, FunctionObject,
    },
    Client,
};
use async_trait::async_trait;
use tokio_stream::StreamExt;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::AgentError;
use crate::llm::{LlmClient, LlmResponse, LlmUsage, ToolCall, ToolSpec};
use crate::message::Message;

/// OpenAI-compatible chat client.
///
/// **Interaction**: Implements `LlmClient`; built by the CLI from `AssistantSettings`.
pub struct ChatOpenAI {
    client: Client<OpenAIConfig>,
    model: String,
    temperature: f32,
}

impl ChatOpenAI {
    /// Build client with default config (API key from `OPENAI_API_KEY` env).
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            model: model.into(),
            temperature: 0.0,
        }
    }

    /// Build client with custom config (e.g. custom API key or base URL).
    pub fn with_config(config: OpenAIConfig, model: impl Into<String>) -> Self {
        Self {
            client: Client::with_config(config),
            model: model.into(),
            temperature: 0.0,
        }
    }

    /// Override the sampling temperature (default 0).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn messages_to_request(messages: &[Message]) -> Vec<ChatCompletionRequestMessage> {
        messages
            .iter()
            .map(|m| match m {
                Message::System(s) => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage::from(s.as_str()),
                ),
                Message::User(s) => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage::from(s.as_str()),
                ),
                Message::Assistant(s) => ChatCompletionRequestMessage::Assistant(s.as_str().into()),
            })
            .collect()
    }

    fn tools_to_request(tools: &[ToolSpec]) -> Vec<ChatCompletionTools> {
        tools
            .iter()
            .map(|t| {
                ChatCompletionTools::Function(ChatCompletionTool {
                    function: FunctionObject {
                        name: t.name.clone(),
                        description: t.description.clone(),
                        parameters: Some(t.input_schema.clone()),
                        ..Default::default()
                    },
                })
            })
            .collect()
    }
}

/// Accumulated fragments of one streamed tool call.
#[derive(Default)]
struct PartialToolCall {
    id: String,
    name: String,
    arguments: String,
}

#[async_trait]
impl LlmClient for ChatOpenAI {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError> {
        let trace_id = Uuid::now_v7().to_string();
        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(self.model.clone());
        args.messages(Self::messages_to_request(messages));
        args.temperature(self.temperature);
        args.stream(true);
        if !tools.is_empty() {
            args.tools(Self::tools_to_request(tools));
        }

        let request = args.build().map_err(|e| {
            AgentError::ExecutionFailed(format!("OpenAI request build failed: {}", e))
        })?;

        debug!(
            trace_id = %trace_id,
            model = %self.model,
            message_count = messages.len(),
            tools_count = tools.len(),
            "OpenAI chat create_stream"
        );
        if let Ok(js) = serde_json::to_string_pretty(&request) {
            trace!(trace_id = %trace_id, request = %js, "OpenAI request body");
        }

        let mut stream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(|e| AgentError::ExecutionFailed(format!("OpenAI stream error: {}", e)))?;

        let mut content = String::new();
        let mut partial_calls: BTreeMap<u32, PartialToolCall> = BTreeMap::new();
        let mut usage: Option<LlmUsage> = None;

        while let Some(result) = stream.next().await {
            let chunk = result
                .map_err(|e| AgentError::ExecutionFailed(format!("OpenAI stream error: {}", e)))?;

            if let Some(u) = chunk.usage {
                usage = Some(LlmUsage {
                    prompt_tokens: u.prompt_tokens,
                    completion_tokens: u.completion_tokens,
                    total_tokens: u.total_tokens,
                });
            }

            for choice in chunk.choices {
                let delta = choice.delta;
                if let Some(text) = delta.content {
                    content.push_str(&text);
                }
                for tc in delta.tool_calls.unwrap_or_default() {
                    let entry = partial_calls.entry(tc.index).or_default();
                    if let Some(id) = tc.id.filter(|id| !id.is_empty()) {
                        entry.id = id;
                    }
                    if let Some(func) = tc.function {
                        if let Some(name) = func.name {
                            entry.name.push_str(&name);
                        }
                        if let Some(arguments) = func.arguments {
                            entry.arguments.push_str(&arguments);
                        }
                    }
                }
            }
        }

        let tool_calls: Vec<ToolCall> = partial_calls
            .into_values()
            .map(|p| ToolCall {
                name: p.name,
                arguments: p.arguments,
                id: (!p.id.is_empty()).then_some(p.id),
            })
            .collect();

        trace!(
            trace_id = %trace_id,
            content = %content,
            tool_calls = ?tool_calls,
            usage = ?usage,
            "OpenAI stream response"
        );

        Ok(LlmResponse {
            content,
            tool_calls,
            usage,
        })
    }
}
