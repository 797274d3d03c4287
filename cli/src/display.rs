//! Terminal and JSON rendering of turn outcomes.

use insight::{AssistantMessage, TurnOutcome};
use serde_json::{json, Value};

const FAILURE_FALLBACK: &str = "Something went wrong while generating the insight.";

/// One message as plain text. Human messages are not echoed.
pub fn render_message(message: &AssistantMessage) -> Option<String> {
    match message {
        AssistantMessage::Human { .. } => None,
        AssistantMessage::Assistant { content, tool_calls, .. } => {
            let mut lines: Vec<String> = Vec::new();
            if !content.trim().is_empty() {
                lines.push(content.trim().to_string());
            }
            lines.extend(
                tool_calls
                    .iter()
                    .map(|call| format!("-> {} {}", call.name, call.arguments)),
            );
            (!lines.is_empty()).then(|| lines.join("\n"))
        }
        AssistantMessage::Visualization { plan, answer, .. } => {
            let mut out = String::from("[insight]");
            if let Some(plan) = plan {
                out.push_str("\nPlan:\n");
                out.push_str(plan.trim());
            }
            if let Some(query) = answer {
                let query = serde_json::to_string_pretty(query).unwrap_or_default();
                out.push_str("\nQuery:\n");
                out.push_str(&query);
            }
            Some(out)
        }
        AssistantMessage::ToolResult { content, .. } => Some(format!("[results]\n{}", content.trim())),
        AssistantMessage::Failure { content, .. } => Some(format!(
            "[failed] {}",
            content.as_deref().unwrap_or(FAILURE_FALLBACK)
        )),
    }
}

/// All messages of a turn, blank-line separated. Interrupted turns end with a
/// hint to answer on the same thread.
pub fn render_outcome(outcome: &TurnOutcome, thread_id: &str) -> String {
    let mut blocks: Vec<String> = outcome.messages().iter().filter_map(render_message).collect();
    if matches!(outcome, TurnOutcome::Interrupted { .. }) {
        blocks.push(format!("(reply with --thread-id {} to continue)", thread_id));
    }
    blocks.join("\n\n")
}

/// `{"thread_id", "status": "completed" | "interrupted", "messages": [...]}`.
pub fn outcome_json(outcome: &TurnOutcome, thread_id: &str) -> Value {
    let status = match outcome {
        TurnOutcome::Completed { .. } => "completed",
        TurnOutcome::Interrupted { .. } => "interrupted",
    };
    json!({
        "thread_id": thread_id,
        "status": status,
        "messages": outcome.messages(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use insight::ToolCall;

    /// **Scenario**: An assistant message prints its text followed by one arrow line per tool call.
    #[test]
    fn assistant_with_tool_call() {
        let message = AssistantMessage::Assistant {
            id: "a1".into(),
            content: "Let me build that.".into(),
            tool_calls: vec![ToolCall {
                name: "create_and_query_insight".into(),
                arguments: r#"{"query_kind":"trends"}"#.into(),
                id: Some("call-1".into()),
            }],
        };
        assert_eq!(
            render_message(&message).unwrap(),
            "Let me build that.\n-> create_and_query_insight {\"query_kind\":\"trends\"}"
        );
    }

    /// **Scenario**: The human message is not printed back.
    #[test]
    fn human_is_not_echoed() {
        assert!(render_message(&AssistantMessage::human("hi")).is_none());
    }

    /// **Scenario**: A failure with no content prints the fallback text.
    #[test]
    fn failure_without_content_uses_fallback() {
        let message = AssistantMessage::Failure {
            id: "f1".into(),
            content: None,
        };
        assert_eq!(render_message(&message).unwrap(), format!("[failed] {}", FAILURE_FALLBACK));
    }

    /// **Scenario**: An interrupted turn prints the question and how to reply on the same thread.
    #[test]
    fn interrupted_outcome_hints_thread() {
        let question = AssistantMessage::assistant("Is this right?");
        let outcome = TurnOutcome::Interrupted {
            messages: vec![question.clone()],
            question,
        };
        let text = render_outcome(&outcome, "t-1");
        assert!(text.starts_with("Is this right?"));
        assert!(text.ends_with("(reply with --thread-id t-1 to continue)"));

        let value = outcome_json(&outcome, "t-1");
        assert_eq!(value["status"], "interrupted");
        assert_eq!(value["messages"].as_array().unwrap().len(), 1);
    }
}
