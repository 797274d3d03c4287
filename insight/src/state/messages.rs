//! Conversation messages stored in `AssistantState::messages`.

use serde::{Deserialize, Serialize};

use crate::insights::InsightQuery;
use crate::llm::ToolCall;

/// New message id (UUIDv4).
pub fn new_message_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// One committed conversation message.
///
/// `Human` starts a generation; `Visualization` carries a generated plan and query;
/// `ToolResult` answers a root tool call (correlated by `tool_call_id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantMessage {
    Human {
        id: String,
        content: String,
    },
    Assistant {
        id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        tool_calls: Vec<ToolCall>,
    },
    Visualization {
        id: String,
        plan: Option<String>,
        answer: Option<InsightQuery>,
        /// Id of the human message that started the generation.
        initiator: Option<String>,
    },
    ToolResult {
        id: String,
        tool_call_id: Option<String>,
        content: String,
    },
    Failure {
        id: String,
        content: Option<String>,
    },
}

impl AssistantMessage {
    pub fn human(content: impl Into<String>) -> Self {
        AssistantMessage::Human {
            id: new_message_id(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        AssistantMessage::Assistant {
            id: new_message_id(),
            content: content.into(),
            tool_calls: Vec::new(),
        }
    }

    pub fn tool_result(tool_call_id: Option<String>, content: impl Into<String>) -> Self {
        AssistantMessage::ToolResult {
            id: new_message_id(),
            tool_call_id,
            content: content.into(),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            AssistantMessage::Human { id, .. }
            | AssistantMessage::Assistant { id, .. }
            | AssistantMessage::Visualization { id, .. }
            | AssistantMessage::ToolResult { id, .. }
            | AssistantMessage::Failure { id, .. } => id,
        }
    }

    pub fn is_human(&self) -> bool {
        matches!(self, AssistantMessage::Human { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Messages serialize with a snake_case `type` tag.
    #[test]
    fn assistant_message_type_tag() {
        let msg = AssistantMessage::Human {
            id: "h1".into(),
            content: "show me signups trend".into(),
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "human");
        assert_eq!(json["id"], "h1");

        let tool = AssistantMessage::tool_result(Some("call-1".into()), "done");
        let json = serde_json::to_value(&tool).unwrap();
        assert_eq!(json["type"], "tool_result");
        assert_eq!(json["tool_call_id"], "call-1");
    }

    /// **Scenario**: Constructors assign distinct ids.
    #[test]
    fn constructors_assign_fresh_ids() {
        let a = AssistantMessage::human("a");
        let b = AssistantMessage::human("a");
        assert_ne!(a.id(), b.id());
        assert!(a.is_human());
        assert!(!AssistantMessage::assistant("x").is_human());
    }
}
