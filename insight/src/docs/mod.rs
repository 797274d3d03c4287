//! Documentation search.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::error::AgentError;
use crate::graph::Node;
use crate::llm::LlmClient;
use crate::message::{merge_message_runs, Message};
use crate::prompts::{render, Prompts};
use crate::root::render_conversation;
use crate::state::{AssistantMessage, AssistantState, PartialAssistantState};

pub const DOCS: &str = "docs";

crate::route_labels! {
    pub enum DocsRoute {
        Root => "root",
        End => "end",
    }
}

/// Answers from the product documentation.
///
/// Emits a "checking documentation" tool result for root's call, then the answer.
/// An answer ending with the continuation marker hands control back to root.
pub struct DocsSearchNode {
    prompts: Arc<Prompts>,
    llm: Arc<dyn LlmClient>,
}

impl DocsSearchNode {
    pub fn new(prompts: Arc<Prompts>, llm: Arc<dyn LlmClient>) -> Self {
        Self { prompts, llm }
    }

    pub fn router(state: &AssistantState) -> DocsRoute {
        match state.last_message() {
            Some(AssistantMessage::ToolResult { .. }) => DocsRoute::Root,
            _ => DocsRoute::End,
        }
    }
}

#[async_trait]
impl Node<AssistantState> for DocsSearchNode {
    fn id(&self) -> &str {
        DOCS
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let root = &self.prompts.root;
        let marker = root.docs_continuation_marker.trim();
        let mut messages = vec![Message::system(render(
            &root.docs_system,
            &[("continuation_marker", marker)],
        ))];
        messages.extend(render_conversation(&state.messages));
        let response = self.llm.invoke(&merge_message_runs(messages), &[]).await?;

        let call_id = state.root_tool_call_id.clone();
        let mut out = vec![AssistantMessage::tool_result(
            call_id.clone(),
            root.docs_checking.trim_end(),
        )];
        let answer = response.content.trim_end();
        match answer.strip_suffix(marker) {
            Some(stripped) => {
                debug!("docs answer asks root to continue");
                out.push(AssistantMessage::assistant(stripped.trim_end()));
                out.push(AssistantMessage::tool_result(call_id, root.docs_continuation.trim_end()));
            }
            None => out.push(AssistantMessage::assistant(answer)),
        }
        Ok(PartialAssistantState::reset().with_messages(out))
    }
}
