//! Model boundary.
//!
//! Nodes call an [`LlmClient`] with role-tagged messages and, optionally, native
//! tool specs. The response carries the assistant text and any native tool calls;
//! the ReAct parser accepts either surface form.

mod mock;
mod openai;

pub use mock::{MockLlm, RecordedCall};
pub use openai::ChatOpenAI;
/// Client configuration (base url, api key) for [`ChatOpenAI::with_config`].
pub use async_openai::config::OpenAIConfig;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AgentError;
use crate::message::Message;

/// Native tool exposed to the model (function calling).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: Option<String>,
    /// JSON Schema of the arguments object.
    pub input_schema: serde_json::Value,
}

/// One native tool call returned by the model.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    /// Raw JSON arguments as returned by the model.
    pub arguments: String,
    pub id: Option<String>,
}

/// Token usage for one LLM call (prompt + completion).
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct LlmUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Response from an LLM completion: assistant message text and optional tool calls.
#[derive(Clone, Debug, Default)]
pub struct LlmResponse {
    /// Assistant message content (plain text).
    pub content: String,
    /// Native tool calls; empty when the model answered in text.
    pub tool_calls: Vec<ToolCall>,
    /// Token usage for this call, when available.
    pub usage: Option<LlmUsage>,
}

/// LLM client: given messages (and native tools, possibly none), returns assistant
/// text and optional tool calls.
///
/// Implementations: `MockLlm` (scripted), `ChatOpenAI` (OpenAI-compatible API).
///
/// **Interaction**: Used by every model-backed node (planners, generators, root,
/// docs, memory nodes).
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<LlmResponse, AgentError>;
}
