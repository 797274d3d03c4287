//! Pausing a run for human input.
//!
//! A node returns `AgentError::Interrupted` instead of a delta. The compiled graph
//! checkpoints the state the node saw and records the node as `next`, so the following
//! invoke with `resume_from_node_id` runs it again with the human reply appended.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// What the paused run hands back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interrupt {
    /// Payload to show the human. The assistant graph puts a serialized
    /// `AssistantMessage` here.
    pub value: serde_json::Value,
    /// Short machine-readable cause, e.g. `memory_confirmation`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl Interrupt {
    pub fn new(value: serde_json::Value) -> Self {
        Self { value, reason: None }
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

#[derive(Debug, Clone, Error)]
#[error("run paused for human input ({})", .0.reason.as_deref().unwrap_or("unspecified"))]
pub struct GraphInterrupt(pub Interrupt);

impl From<Interrupt> for GraphInterrupt {
    fn from(interrupt: Interrupt) -> Self {
        GraphInterrupt(interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// **Scenario**: The reason shows up in the error text; without one the text says so.
    #[test]
    fn display_names_the_reason() {
        let paused = GraphInterrupt::from(
            Interrupt::new(json!({"content": "Is this right?"})).with_reason("memory_confirmation"),
        );
        assert_eq!(paused.to_string(), "run paused for human input (memory_confirmation)");
        let bare = GraphInterrupt(Interrupt::new(json!(null)));
        assert!(bare.to_string().contains("unspecified"));
    }

    /// **Scenario**: A reason-less interrupt serializes without the `reason` key.
    #[test]
    fn reason_is_optional_on_the_wire() {
        let value = serde_json::to_value(Interrupt::new(json!("q"))).unwrap();
        assert_eq!(value, json!({"value": "q"}));
        let back: Interrupt = serde_json::from_value(value).unwrap();
        assert!(back.reason.is_none());
    }
}
