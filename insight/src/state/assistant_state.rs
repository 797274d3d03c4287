//! AssistantState and the PartialAssistantState delta nodes return.

use serde::{Deserialize, Serialize};

use crate::core_memory::ScrapingStatus;
use crate::graph::GraphState;
use crate::insights::InsightKind;
use crate::llm::ToolCall;

use super::messages::AssistantMessage;

/// Synthetic tool name for a corrective step after unparseable model output.
pub const HANDLE_INCORRECT_RESPONSE: &str = "handle_incorrect_response";

/// A tool invocation chosen by a planner or synthesized after a parse failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentAction {
    pub tool: String,
    /// Free-form input, validated per tool by the tools node.
    pub tool_input: serde_json::Value,
    /// The model's rationale (or the raw output that failed to parse).
    pub log: String,
}

impl AgentAction {
    pub fn new(tool: impl Into<String>, tool_input: serde_json::Value, log: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            tool_input,
            log: log.into(),
        }
    }

    /// Corrective action: the observation becomes `instruction` once the tools node runs.
    pub fn incorrect_response(instruction: impl Into<String>, log: impl Into<String>) -> Self {
        Self::new(
            HANDLE_INCORRECT_RESPONSE,
            serde_json::Value::String(instruction.into()),
            log,
        )
    }
}

/// One scratchpad entry: the action and its observation (`None` until executed).
pub type IntermediateStep = (AgentAction, Option<String>);

/// One entry of the memory collector's private conversation with the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CollectorMessage {
    Assistant {
        content: String,
        tool_calls: Vec<ToolCall>,
    },
    ToolResult {
        tool_call_id: Option<String>,
        content: String,
    },
}

/// Conversation state merged node by node.
///
/// At most one ReAct episode is in flight: `intermediate_steps` is emptied when a
/// plan is found, when a generation finishes, and on every reset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssistantState {
    pub messages: Vec<AssistantMessage>,
    pub intermediate_steps: Vec<IntermediateStep>,
    pub plan: Option<String>,
    /// Human message that began the current generation.
    pub start_id: Option<String>,
    /// Set when root delegated to a sub-agent.
    pub root_tool_call_id: Option<String>,
    /// Root-provided description of the insight to build (seed for the planner).
    pub root_tool_insight_plan: Option<String>,
    pub root_tool_insight_type: Option<InsightKind>,
    /// Delegations made by root in the current turn.
    pub root_tool_calls_count: u32,
    pub memory_collection_messages: Vec<CollectorMessage>,
    /// Outcome of the last memory initialization attempt in this turn.
    pub memory_scraping_status: Option<ScrapingStatus>,
}

impl AssistantState {
    pub fn last_message(&self) -> Option<&AssistantMessage> {
        self.messages.last()
    }
}

/// Delta returned by a node.
///
/// `reset` clears the ReAct, plan and delegation fields before the rest of the delta
/// is applied; committed messages survive. `messages` are merged by id (replace if
/// the id exists, append otherwise). Every other `Some` field replaces the current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialAssistantState {
    pub reset: bool,
    pub messages: Vec<AssistantMessage>,
    pub intermediate_steps: Option<Vec<IntermediateStep>>,
    pub plan: Option<String>,
    pub start_id: Option<String>,
    pub root_tool_call_id: Option<String>,
    pub root_tool_insight_plan: Option<String>,
    pub root_tool_insight_type: Option<InsightKind>,
    pub root_tool_calls_count: Option<u32>,
    pub memory_collection_messages: Option<Vec<CollectorMessage>>,
    pub memory_scraping_status: Option<ScrapingStatus>,
}

impl PartialAssistantState {
    /// Reset delta: hands control back to root with a clean episode.
    pub fn reset() -> Self {
        Self {
            reset: true,
            ..Default::default()
        }
    }

    pub fn with_messages(mut self, messages: Vec<AssistantMessage>) -> Self {
        self.messages = messages;
        self
    }

    pub fn with_intermediate_steps(mut self, steps: Vec<IntermediateStep>) -> Self {
        self.intermediate_steps = Some(steps);
        self
    }
}

impl GraphState for AssistantState {
    type Update = PartialAssistantState;

    fn apply(&mut self, update: PartialAssistantState) {
        if update.reset {
            self.intermediate_steps.clear();
            self.plan = None;
            self.root_tool_call_id = None;
            self.root_tool_insight_plan = None;
            self.root_tool_insight_type = None;
            self.memory_collection_messages.clear();
        }
        for message in update.messages {
            match self.messages.iter_mut().find(|m| m.id() == message.id()) {
                Some(existing) => *existing = message,
                None => self.messages.push(message),
            }
        }
        if let Some(steps) = update.intermediate_steps {
            self.intermediate_steps = steps;
        }
        if let Some(plan) = update.plan {
            self.plan = Some(plan);
        }
        if let Some(start_id) = update.start_id {
            self.start_id = Some(start_id);
        }
        if let Some(id) = update.root_tool_call_id {
            self.root_tool_call_id = Some(id);
        }
        if let Some(plan) = update.root_tool_insight_plan {
            self.root_tool_insight_plan = Some(plan);
        }
        if let Some(kind) = update.root_tool_insight_type {
            self.root_tool_insight_type = Some(kind);
        }
        if let Some(count) = update.root_tool_calls_count {
            self.root_tool_calls_count = count;
        }
        if let Some(messages) = update.memory_collection_messages {
            self.memory_collection_messages = messages;
        }
        if let Some(status) = update.memory_scraping_status {
            self.memory_scraping_status = Some(status);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delegated_state() -> AssistantState {
        AssistantState {
            messages: vec![AssistantMessage::Human {
                id: "h1".into(),
                content: "signups".into(),
            }],
            intermediate_steps: vec![(
                AgentAction::new("retrieve_event_properties", "signed_up".into(), "log"),
                None,
            )],
            plan: Some("Events:\n- signed_up".into()),
            start_id: Some("h1".into()),
            root_tool_call_id: Some("call-1".into()),
            root_tool_insight_plan: Some("signups over time".into()),
            root_tool_insight_type: Some(InsightKind::Trends),
            root_tool_calls_count: 1,
            ..Default::default()
        }
    }

    /// **Scenario**: A reset clears ReAct, plan and delegation fields but keeps messages and the per-turn count.
    #[test]
    fn reset_clears_episode_keeps_messages() {
        let mut state = delegated_state();
        state.apply(
            PartialAssistantState::reset()
                .with_messages(vec![AssistantMessage::tool_result(Some("call-1".into()), "help")]),
        );
        assert_eq!(state.messages.len(), 2);
        assert!(state.intermediate_steps.is_empty());
        assert!(state.plan.is_none());
        assert!(state.root_tool_call_id.is_none());
        assert!(state.root_tool_insight_plan.is_none());
        assert!(state.root_tool_insight_type.is_none());
        assert_eq!(state.start_id.as_deref(), Some("h1"));
        assert_eq!(state.root_tool_calls_count, 1);
    }

    /// **Scenario**: Messages with an existing id replace it in place; new ids append.
    #[test]
    fn messages_merge_by_id() {
        let mut state = delegated_state();
        state.apply(PartialAssistantState::default().with_messages(vec![
            AssistantMessage::Human {
                id: "h1".into(),
                content: "edited".into(),
            },
            AssistantMessage::assistant("hello"),
        ]));
        assert_eq!(state.messages.len(), 2);
        assert!(matches!(&state.messages[0], AssistantMessage::Human { content, .. } if content == "edited"));
    }

    /// **Scenario**: `intermediate_steps: Some(vec![])` empties the scratchpad; `None` leaves it.
    #[test]
    fn intermediate_steps_replace_semantics() {
        let mut state = delegated_state();
        state.apply(PartialAssistantState::default());
        assert_eq!(state.intermediate_steps.len(), 1);
        state.apply(PartialAssistantState::default().with_intermediate_steps(vec![]));
        assert!(state.intermediate_steps.is_empty());
    }

    /// **Scenario**: State survives a JSON round trip (checkpoint payload).
    #[test]
    fn state_serializes_for_checkpoints() {
        let state = delegated_state();
        let json = serde_json::to_vec(&state).unwrap();
        let back: AssistantState = serde_json::from_slice(&json).unwrap();
        assert_eq!(back, state);
    }
}
