//! Conversation reconstruction for planner prompts.
//!
//! The planner only sees previously asked questions and previously generated plans,
//! sliced to the human message that started the current generation. The output is
//! a pure function of `(messages, start_id, root_tool_insight_plan)`.

use crate::message::Message;
use crate::prompts::{render, TaxonomyPrompts};
use crate::state::AssistantMessage;

/// Messages up to and including `start_id`; everything when it is absent or unknown.
pub fn slice_messages_to_conversation_start<'a>(
    messages: &'a [AssistantMessage],
    start_id: Option<&str>,
) -> &'a [AssistantMessage] {
    match start_id.and_then(|id| messages.iter().position(|m| m.id() == id)) {
        Some(pos) => &messages[..=pos],
        None => messages,
    }
}

/// Keeps human and visualization messages and merges runs of adjacent human messages.
///
/// A merged human message joins the distinct contents of the run with a newline
/// and takes the id of the run's last message.
pub fn filter_and_merge_messages(messages: &[AssistantMessage]) -> Vec<AssistantMessage> {
    let mut out: Vec<AssistantMessage> = Vec::new();
    let mut run: Vec<&str> = Vec::new();
    for message in messages {
        match message {
            AssistantMessage::Human { id, content } => {
                let merged = match out.last_mut() {
                    Some(AssistantMessage::Human {
                        id: last_id,
                        content: last_content,
                    }) => {
                        if !run.contains(&content.as_str()) {
                            last_content.push('\n');
                            last_content.push_str(content);
                        }
                        *last_id = id.clone();
                        true
                    }
                    _ => false,
                };
                if !merged {
                    run.clear();
                    out.push(message.clone());
                }
                run.push(content);
            }
            AssistantMessage::Visualization { .. } => out.push(message.clone()),
            _ => {}
        }
    }
    out
}

/// Rebuilds the planner-facing conversation.
///
/// - The first human message becomes the initial question. The root-provided
///   `insight_plan` replaces its text when it is the only human message.
/// - A later human message that started the generation becomes a follow-up, using
///   `insight_plan` when present.
/// - Only the `start_id` message gets the format reminder.
/// - Other human messages pass through; visualizations become assistant turns with
///   their plan.
pub fn reconstruct_conversation(
    messages: &[AssistantMessage],
    start_id: Option<&str>,
    insight_plan: Option<&str>,
    prompts: &TaxonomyPrompts,
) -> Vec<Message> {
    let filtered = filter_and_merge_messages(slice_messages_to_conversation_start(messages, start_id));
    let human_count = filtered.iter().filter(|m| m.is_human()).count();
    let seed = insight_plan.filter(|s| !s.is_empty());

    filtered
        .iter()
        .enumerate()
        .filter_map(|(idx, message)| match message {
            AssistantMessage::Human { id, content } => {
                let is_start = start_id == Some(id.as_str());
                let reminder = if is_start {
                    format!("\n{}", prompts.react_format_reminder.trim_end())
                } else {
                    String::new()
                };
                if idx == 0 {
                    let question = seed
                        .filter(|_| human_count == 1)
                        .unwrap_or(content.as_str());
                    Some(Message::user(render(
                        &prompts.react_user,
                        &[("question", question), ("react_format_reminder", &reminder)],
                    )))
                } else if is_start {
                    let feedback = seed.unwrap_or(content.as_str());
                    Some(Message::user(render(
                        &prompts.react_follow_up,
                        &[("feedback", feedback), ("react_format_reminder", &reminder)],
                    )))
                } else {
                    Some(Message::user(content.clone()))
                }
            }
            AssistantMessage::Visualization { plan, .. } => {
                Some(Message::assistant(plan.clone().unwrap_or_default()))
            }
            _ => None,
        })
        .collect()
}
