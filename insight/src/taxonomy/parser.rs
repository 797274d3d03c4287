//! ReAct output parser.
//!
//! Accepts either the textual `Thought / Action / Action Input` format, where the
//! action is a fenced JSON blob `{"action": ..., "action_input": ...}`, or a native
//! tool call. Only the first fenced block is considered.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use crate::llm::LlmResponse;
use crate::state::AgentAction;

/// Why the model output could not be turned into an action. Each variant carries
/// the raw output so the planner can echo it back.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReActParseError {
    #[error("model output has no `Action:` block")]
    MissingAction { output: String },
    #[error("model output has a malformed action JSON")]
    MalformedJson { output: String },
    #[error("could not parse model output")]
    Generic { output: String },
}

impl ReActParseError {
    pub fn output(&self) -> &str {
        match self {
            ReActParseError::MissingAction { output }
            | ReActParseError::MalformedJson { output }
            | ReActParseError::Generic { output } => output,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ReActParseError::MissingAction { .. } => "missing_action",
            ReActParseError::MalformedJson { .. } => "malformed_json",
            ReActParseError::Generic { .. } => "generic",
        }
    }
}

static ACTION_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^.*?`{3}(?:json)?\n?(.*?)`{3}.*?$").expect("action block regex"));

/// Parses textual ReAct output into an action.
pub fn parse_react_text(text: &str) -> Result<AgentAction, ReActParseError> {
    if !text.contains("Action:") {
        return Err(ReActParseError::MissingAction {
            output: text.to_string(),
        });
    }
    let malformed = || ReActParseError::MalformedJson {
        output: text.to_string(),
    };
    let block = ACTION_BLOCK
        .captures(text)
        .and_then(|c| c.get(1))
        .ok_or_else(malformed)?;
    let value: serde_json::Value =
        serde_json::from_str(block.as_str().trim()).map_err(|_| malformed())?;
    let object = value.as_object().ok_or_else(malformed)?;
    let (Some(action), Some(action_input)) = (object.get("action"), object.get("action_input"))
    else {
        return Err(malformed());
    };
    let tool = action
        .as_str()
        .ok_or_else(|| ReActParseError::Generic {
            output: text.to_string(),
        })?
        .to_string();
    Ok(AgentAction::new(tool, action_input.clone(), text))
}

/// Parses a model response: a native tool call wins over text.
pub fn parse_react_agent_output(response: &LlmResponse) -> Result<AgentAction, ReActParseError> {
    match response.tool_calls.first() {
        Some(call) => {
            let input: serde_json::Value = if call.arguments.trim().is_empty() {
                serde_json::Value::Object(Default::default())
            } else {
                serde_json::from_str(&call.arguments).map_err(|_| ReActParseError::MalformedJson {
                    output: format!("{}{}", response.content, call.arguments),
                })?
            };
            Ok(AgentAction::new(call.name.clone(), input, response.content.clone()))
        }
        None => parse_react_text(&response.content),
    }
}
