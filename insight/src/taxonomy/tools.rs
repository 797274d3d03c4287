//! The taxonomy agent's fixed tool catalog.
//!
//! A planner action is validated into [`TaxonomyTool`] before the tools node
//! dispatches it; the match in the tools node is exhaustive over this enum.

use serde_json::Value;
use thiserror::Error;

use crate::state::{AgentAction, HANDLE_INCORRECT_RESPONSE};

/// Tool names and descriptions as presented to the model.
pub const TAXONOMY_TOOL_DESCRIPTIONS: &[(&str, &str)] = &[
    (
        "retrieve_event_properties",
        "Use this tool to retrieve the property names of an event that the user has in their taxonomy. You will receive a list of properties, their value types and example values or a message that properties have not been found.\n\n- Try other events if the tool doesn't return any properties.\n- Prioritize properties that are directly related to the context or objective of the user's query.\n- Avoid using ambiguous properties unless their relevance is explicitly confirmed.\n\nArgs:\n    event_name: The name of the event that you want to retrieve properties for.",
    ),
    (
        "retrieve_event_property_values",
        "Use this tool to retrieve the property values for an event that the user has in their taxonomy. Adjust filters to these values. You will receive a list of property values or a message that property values have not been found. Some properties can have many values, so the output will be truncated. Use your judgment to find a proper value.\n\nArgs:\n    event_name: The name of the event that you want to retrieve values for.\n    property_name: The name of the property that you want to retrieve values for.",
    ),
    (
        "retrieve_entity_properties",
        "Use this tool to retrieve property names for a property group (entity) that the user has in their taxonomy. You will receive a list of properties and their value types or a message that properties have not been found.\n\n- **Infer the property groups from the user's request.**\n- **Try other entities** if the tool doesn't return any properties.\n- **Prioritize properties that are directly related to the context or objective of the user's query.**\n- **Avoid using ambiguous properties** unless their relevance is explicitly confirmed.\n\nArgs:\n    entity: The type of the entity that you want to retrieve properties for.",
    ),
    (
        "retrieve_entity_property_values",
        "Use this tool to retrieve property values for a property name that the user has in their taxonomy. Adjust filters to these values. You will receive a list of property values or a message that property values have not been found. Some properties can have many values, so the output will be truncated. Use your judgment to find a proper value.\n\nArgs:\n    entity: The type of the entity that you want to retrieve properties for.\n    property_name: The name of the property that you want to retrieve values for.",
    ),
    (
        "ask_user_for_help",
        "Use this tool to ask a question to the user. Your question must be concise and clear.\n\nArgs:\n    request: The question you want to ask.",
    ),
    (
        "final_answer",
        "Use this tool to provide the final answer to the user's question.\n\nArgs:\n    final_response: List all events, actions, and properties that you want to use to answer the question.",
    ),
];

/// One field that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Dotted path, e.g. `arguments.event_name`.
    pub path: String,
    pub message: String,
}

/// Tool arguments did not match the tool's schema. Lists every offending field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", render_field_errors(.errors))]
pub struct ToolValidationError {
    pub tool: String,
    pub errors: Vec<FieldError>,
}

fn render_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.path, e.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// A validated taxonomy tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaxonomyTool {
    FinalAnswer(String),
    AskUserForHelp(String),
    RetrieveEventProperties(String),
    RetrieveEventPropertyValues {
        event_name: String,
        property_name: String,
    },
    RetrieveEntityProperties(String),
    RetrieveEntityPropertyValues {
        entity: String,
        property_name: String,
    },
    /// Corrective step; the argument is the observation to feed back.
    HandleIncorrectResponse(String),
}

impl TaxonomyTool {
    pub fn name(&self) -> &'static str {
        match self {
            TaxonomyTool::FinalAnswer(_) => "final_answer",
            TaxonomyTool::AskUserForHelp(_) => "ask_user_for_help",
            TaxonomyTool::RetrieveEventProperties(_) => "retrieve_event_properties",
            TaxonomyTool::RetrieveEventPropertyValues { .. } => "retrieve_event_property_values",
            TaxonomyTool::RetrieveEntityProperties(_) => "retrieve_entity_properties",
            TaxonomyTool::RetrieveEntityPropertyValues { .. } => "retrieve_entity_property_values",
            TaxonomyTool::HandleIncorrectResponse(_) => HANDLE_INCORRECT_RESPONSE,
        }
    }

    /// Validates an action against the tool schema.
    ///
    /// A tool name outside the catalog is not a validation error: it becomes a
    /// corrective step telling the model which tools exist.
    pub fn from_action(action: &AgentAction) -> Result<Self, ToolValidationError> {
        let mut errors = Vec::new();
        let input = &action.tool_input;
        let tool = match action.tool.as_str() {
            "final_answer" => TaxonomyTool::FinalAnswer(string_arg(input, "arguments", &mut errors)),
            "ask_user_for_help" => {
                TaxonomyTool::AskUserForHelp(string_arg(input, "arguments", &mut errors))
            }
            "retrieve_event_properties" => {
                TaxonomyTool::RetrieveEventProperties(string_arg(input, "arguments", &mut errors))
            }
            "retrieve_entity_properties" => {
                TaxonomyTool::RetrieveEntityProperties(string_arg(input, "arguments", &mut errors))
            }
            "retrieve_event_property_values" => {
                let [event_name, property_name] =
                    object_args(input, ["event_name", "property_name"], &mut errors);
                TaxonomyTool::RetrieveEventPropertyValues {
                    event_name,
                    property_name,
                }
            }
            "retrieve_entity_property_values" => {
                let [entity, property_name] =
                    object_args(input, ["entity", "property_name"], &mut errors);
                TaxonomyTool::RetrieveEntityPropertyValues {
                    entity,
                    property_name,
                }
            }
            HANDLE_INCORRECT_RESPONSE => {
                TaxonomyTool::HandleIncorrectResponse(string_arg(input, "arguments", &mut errors))
            }
            unknown => TaxonomyTool::HandleIncorrectResponse(format!(
                "The tool `{}` does not exist. You must use one of the following tools: {}.",
                unknown,
                tool_names()
            )),
        };
        if errors.is_empty() {
            Ok(tool)
        } else {
            Err(ToolValidationError {
                tool: action.tool.clone(),
                errors,
            })
        }
    }
}

/// Comma-separated names of the model-facing tools.
pub fn tool_names() -> String {
    TAXONOMY_TOOL_DESCRIPTIONS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

/// `name: description` per tool, for the ReAct format prompt.
pub fn render_text_description() -> String {
    TAXONOMY_TOOL_DESCRIPTIONS
        .iter()
        .map(|(name, description)| format!("{}: {}", name, description))
        .collect::<Vec<_>>()
        .join("\n")
}

fn string_arg(value: &Value, path: &str, errors: &mut Vec<FieldError>) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => {
            errors.push(FieldError {
                path: path.to_string(),
                message: "Field required".into(),
            });
            String::new()
        }
        _ => {
            errors.push(FieldError {
                path: path.to_string(),
                message: "Input should be a valid string".into(),
            });
            String::new()
        }
    }
}

fn object_args<const N: usize>(
    value: &Value,
    fields: [&str; N],
    errors: &mut Vec<FieldError>,
) -> [String; N] {
    let Some(object) = value.as_object() else {
        errors.push(FieldError {
            path: "arguments".into(),
            message: "Input should be a valid dictionary".into(),
        });
        return fields.map(|_| String::new());
    };
    fields.map(|field| {
        let path = format!("arguments.{}", field);
        string_arg(object.get(field).unwrap_or(&Value::Null), &path, errors)
    })
}
