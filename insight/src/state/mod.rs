//! Assistant conversation state.
//!
//! `AssistantState` flows through the assistant graph; nodes return
//! `PartialAssistantState` deltas that are merged by `GraphState::apply`.

mod assistant_state;
mod messages;

pub use assistant_state::{
    AgentAction, AssistantState, CollectorMessage, IntermediateStep, PartialAssistantState,
    HANDLE_INCORRECT_RESPONSE,
};
pub use messages::{new_message_id, AssistantMessage};
