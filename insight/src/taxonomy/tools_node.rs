//! Executes the planner's pending action.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::toolkit::TaxonomyToolkit;
use super::tools::TaxonomyTool;
use crate::error::AgentError;
use crate::graph::Node;
use crate::prompts::{render, Prompts};
use crate::state::{AssistantMessage, AssistantState, PartialAssistantState};

crate::route_labels! {
    /// Where control goes after a tool ran.
    pub enum ToolsRoute {
        Continue => "continue",
        PlanFound => "plan_found",
        Root => "root",
    }
}

/// Tools node paired with a taxonomy planner.
///
/// Only the last step is executed and its observation must still be empty. Schema
/// violations are fed back as the observation; provider failures abort the turn.
pub struct TaxonomyToolsNode {
    id: String,
    toolkit: Arc<TaxonomyToolkit>,
    prompts: Arc<Prompts>,
}

impl TaxonomyToolsNode {
    pub fn new(id: impl Into<String>, toolkit: Arc<TaxonomyToolkit>, prompts: Arc<Prompts>) -> Self {
        Self {
            id: id.into(),
            toolkit,
            prompts,
        }
    }

    pub fn router(state: &AssistantState) -> ToolsRoute {
        if state.root_tool_call_id.is_none() {
            return ToolsRoute::Root;
        }
        if state.plan.as_deref().is_some_and(|p| !p.is_empty()) {
            return ToolsRoute::PlanFound;
        }
        ToolsRoute::Continue
    }
}

#[async_trait]
impl Node<AssistantState> for TaxonomyToolsNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let Some(((action, observation), executed)) = state.intermediate_steps.split_last() else {
            return Err(AgentError::ExecutionFailed(format!(
                "{}: no pending action",
                self.id
            )));
        };
        if observation.is_some() {
            return Err(AgentError::ExecutionFailed(format!(
                "{}: the last action was already executed",
                self.id
            )));
        }
        let with_observation = |output: String| {
            let mut steps = executed.to_vec();
            steps.push((action.clone(), Some(output)));
            PartialAssistantState::default().with_intermediate_steps(steps)
        };

        let tool = match TaxonomyTool::from_action(action) {
            Ok(tool) => tool,
            Err(error) => {
                warn!(node = %self.id, tool = %action.tool, error = %error, "tool arguments failed validation");
                let observation = render(
                    &self.prompts.taxonomy.react_validation_exception,
                    &[("exception", &error.to_string())],
                );
                return Ok(with_observation(observation));
            }
        };
        debug!(node = %self.id, tool = tool.name(), "dispatching taxonomy tool");

        let lookup = |e: super::provider::TaxonomyError| AgentError::ExecutionFailed(e.to_string());
        let output = match tool {
            TaxonomyTool::FinalAnswer(plan) => {
                return Ok(PartialAssistantState {
                    plan: Some(plan),
                    ..Default::default()
                }
                .with_intermediate_steps(Vec::new()));
            }
            TaxonomyTool::AskUserForHelp(request) => {
                let content = render(&self.prompts.taxonomy.react_help_request, &[("request", &request)]);
                return Ok(PartialAssistantState::reset().with_messages(vec![
                    AssistantMessage::tool_result(state.root_tool_call_id.clone(), content.trim_end()),
                ]));
            }
            TaxonomyTool::RetrieveEventProperties(event_name) => self
                .toolkit
                .retrieve_event_properties(&event_name)
                .await
                .map_err(lookup)?,
            TaxonomyTool::RetrieveEventPropertyValues {
                event_name,
                property_name,
            } => self
                .toolkit
                .retrieve_event_property_values(&event_name, &property_name)
                .await
                .map_err(lookup)?,
            TaxonomyTool::RetrieveEntityProperties(entity) => self
                .toolkit
                .retrieve_entity_properties(&entity)
                .await
                .map_err(lookup)?,
            TaxonomyTool::RetrieveEntityPropertyValues {
                entity,
                property_name,
            } => self
                .toolkit
                .retrieve_entity_property_values(&entity, &property_name)
                .await
                .map_err(lookup)?,
            TaxonomyTool::HandleIncorrectResponse(instruction) => {
                self.toolkit.handle_incorrect_response(&instruction)
            }
        };
        Ok(with_observation(output))
    }
}
