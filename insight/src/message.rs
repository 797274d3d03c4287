//! Prompt message types sent to the model.
//!
//! Conversation history lives in [`crate::state::AssistantMessage`]; nodes render it
//! into these role-tagged messages right before a model call.

use serde::{Deserialize, Serialize};

/// One role-tagged prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", content = "content", rename_all = "lowercase")]
pub enum Message {
    System(String),
    User(String),
    Assistant(String),
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System(content.into())
    }

    pub fn user(content: impl Into<String>) -> Self {
        Message::User(content.into())
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Message::Assistant(content.into())
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System(s) | Message::User(s) | Message::Assistant(s) => s,
        }
    }

    fn same_role(&self, other: &Message) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    fn content_mut(&mut self) -> &mut String {
        match self {
            Message::System(s) | Message::User(s) | Message::Assistant(s) => s,
        }
    }
}

/// Joins adjacent messages of the same role with a newline.
///
/// Applied to every prompt before the model call, so a system preamble assembled
/// from several templates arrives as a single system message.
pub fn merge_message_runs(messages: Vec<Message>) -> Vec<Message> {
    let mut merged: Vec<Message> = Vec::with_capacity(messages.len());
    for message in messages {
        match merged.last_mut() {
            Some(last) if last.same_role(&message) => {
                let text = last.content_mut();
                text.push('\n');
                text.push_str(message.content());
            }
            _ => merged.push(message),
        }
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Adjacent same-role messages merge; role changes start a new message.
    #[test]
    fn merge_message_runs_joins_adjacent_same_role() {
        let merged = merge_message_runs(vec![
            Message::system("a"),
            Message::system("b"),
            Message::user("q"),
            Message::assistant("plan"),
            Message::user("x"),
            Message::user("y"),
        ]);
        assert_eq!(
            merged,
            vec![
                Message::system("a\nb"),
                Message::user("q"),
                Message::assistant("plan"),
                Message::user("x\ny"),
            ]
        );
    }

    /// **Scenario**: Empty input stays empty.
    #[test]
    fn merge_message_runs_empty() {
        assert!(merge_message_runs(vec![]).is_empty());
    }
}
