//! One ReAct planning step over the team's taxonomy.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use super::events::render_events_prompt;
use super::parser::{parse_react_agent_output, ReActParseError};
use super::reconstruct::reconstruct_conversation;
use super::toolkit::TaxonomyToolkit;
use super::tools::{render_text_description, tool_names, TaxonomyTool};
use crate::core_memory::CoreMemoryStore;
use crate::error::AgentError;
use crate::graph::Node;
use crate::llm::LlmClient;
use crate::message::{merge_message_runs, Message};
use crate::prompts::{render, Prompts};
use crate::state::{AgentAction, AssistantState, IntermediateStep, PartialAssistantState};
use crate::team::Team;

/// Consecutive corrective steps allowed before the turn fails.
pub const DEFAULT_MAX_PARSE_CORRECTIONS: usize = 3;

crate::route_labels! {
    pub enum PlannerRoute {
        Tools => "tools",
    }
}

/// Planner node for one insight family.
///
/// Each run appends exactly one `(action, None)` step. Unparseable output becomes a
/// `handle_incorrect_response` step carrying the corrective instruction. The events
/// prompt is fetched once per node instance; the graph is built per turn.
pub struct TaxonomyPlannerNode {
    id: String,
    system_template: String,
    prompts: Arc<Prompts>,
    llm: Arc<dyn LlmClient>,
    toolkit: Arc<TaxonomyToolkit>,
    team: Arc<Team>,
    core_memory: Arc<dyn CoreMemoryStore>,
    max_parse_corrections: usize,
    events_prompt: OnceCell<String>,
}

impl TaxonomyPlannerNode {
    pub fn new(
        id: impl Into<String>,
        system_template: impl Into<String>,
        prompts: Arc<Prompts>,
        llm: Arc<dyn LlmClient>,
        toolkit: Arc<TaxonomyToolkit>,
        team: Arc<Team>,
        core_memory: Arc<dyn CoreMemoryStore>,
    ) -> Self {
        Self {
            id: id.into(),
            system_template: system_template.into(),
            prompts,
            llm,
            toolkit,
            team,
            core_memory,
            max_parse_corrections: DEFAULT_MAX_PARSE_CORRECTIONS,
            events_prompt: OnceCell::new(),
        }
    }

    pub fn with_max_parse_corrections(mut self, max: usize) -> Self {
        self.max_parse_corrections = max;
        self
    }

    /// `tools` while a step is pending; an empty scratchpad means the planner did not run.
    pub fn router(state: &AssistantState) -> Result<PlannerRoute, AgentError> {
        if state.intermediate_steps.is_empty() {
            return Err(AgentError::ExecutionFailed("Invalid state.".into()));
        }
        Ok(PlannerRoute::Tools)
    }

    async fn events_prompt(&self) -> Result<&str, AgentError> {
        let prompt = self
            .events_prompt
            .get_or_try_init(|| async {
                let events = self
                    .toolkit
                    .provider()
                    .events()
                    .await
                    .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
                Ok::<_, AgentError>(render_events_prompt(&events))
            })
            .await?;
        Ok(prompt.as_str())
    }

    async fn build_messages(&self, state: &AssistantState) -> Result<Vec<Message>, AgentError> {
        let taxonomy = &self.prompts.taxonomy;
        let core_memory = self
            .core_memory
            .get()
            .await
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
        let react_format = render(
            &taxonomy.react_format,
            &[
                ("tools", &render_text_description()),
                ("tool_names", &tool_names()),
            ],
        );
        let groups = self.team.group_types.join(", ");
        let property_filters = render(&taxonomy.react_property_filters, &[("groups", &groups)]);
        let now = self.team.now();
        let system = render(
            &self.system_template,
            &[
                ("react_format", &react_format),
                ("react_human_in_the_loop", &taxonomy.react_human_in_the_loop),
                ("react_property_filters", &property_filters),
                ("core_memory_instructions", &taxonomy.core_memory_instructions),
                ("core_memory", &core_memory.text),
                ("project_name", &self.team.name),
                ("project_datetime", &now),
                ("project_timezone", self.team.timezone_or_utc()),
            ],
        );

        let entities = self.toolkit.entities().join(", ");
        let definitions = render(
            &taxonomy.react_definitions,
            &[("events", self.events_prompt().await?), ("entities", &entities)],
        );

        let mut messages = vec![Message::system(system), Message::user(definitions)];
        messages.extend(reconstruct_conversation(
            &state.messages,
            state.start_id.as_deref(),
            state.root_tool_insight_plan.as_deref(),
            taxonomy,
        ));
        messages.push(Message::user(render(
            &taxonomy.react_scratchpad,
            &[("agent_scratchpad", &render_scratchpad(&state.intermediate_steps))],
        )));
        Ok(merge_message_runs(messages))
    }

    fn corrective_action(&self, error: &ReActParseError) -> AgentAction {
        let taxonomy = &self.prompts.taxonomy;
        match error {
            ReActParseError::MissingAction { output } => AgentAction::incorrect_response(
                taxonomy.react_missing_action.trim_end(),
                render(&taxonomy.react_missing_action_correction, &[("output", output)]).trim_end(),
            ),
            other => AgentAction::incorrect_response(
                taxonomy.react_malformed_json.trim_end(),
                other.output(),
            ),
        }
    }
}

/// Executed steps as `log`, observation and the next `Thought:` prefix.
pub fn render_scratchpad(steps: &[IntermediateStep]) -> String {
    let mut out = String::new();
    for (action, observation) in steps {
        if let Some(observation) = observation {
            out.push_str(&action.log);
            out.push_str("\nObservation: ");
            out.push_str(observation);
            out.push_str("\nThought: ");
        }
    }
    out
}

/// Unknown tools, invalid arguments and explicit corrections all send the model
/// back with an instruction instead of progressing.
fn is_corrective(action: &AgentAction) -> bool {
    matches!(
        TaxonomyTool::from_action(action),
        Err(_) | Ok(TaxonomyTool::HandleIncorrectResponse(_))
    )
}

fn trailing_corrections(steps: &[IntermediateStep]) -> usize {
    steps
        .iter()
        .rev()
        .take_while(|(action, _)| is_corrective(action))
        .count()
}

#[async_trait]
impl Node<AssistantState> for TaxonomyPlannerNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let messages = self.build_messages(state).await?;
        let response = self.llm.invoke(&messages, &[]).await?;
        let (action, corrective) = match parse_react_agent_output(&response) {
            Ok(action) => {
                debug!(node = %self.id, tool = %action.tool, "planner chose action");
                let corrective = is_corrective(&action);
                (action, corrective)
            }
            Err(error) => {
                warn!(node = %self.id, kind = error.kind(), "recovering from unparseable model output");
                (self.corrective_action(&error), true)
            }
        };
        if corrective {
            let attempt = trailing_corrections(&state.intermediate_steps) + 1;
            if attempt > self.max_parse_corrections {
                return Err(AgentError::ExecutionFailed(format!(
                    "{}: model output could not be parsed or validated after {} corrections",
                    self.id, self.max_parse_corrections
                )));
            }
            debug!(node = %self.id, tool = %action.tool, attempt, "corrective step");
        }
        let mut steps = state.intermediate_steps.clone();
        steps.push((action, None));
        Ok(PartialAssistantState::default().with_intermediate_steps(steps))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_memory::InMemoryCoreMemory;
    use crate::llm::MockLlm;
    use crate::state::{AssistantMessage, HANDLE_INCORRECT_RESPONSE};
    use crate::taxonomy::provider::InMemoryTaxonomy;
    use serde_json::json;

    fn planner(llm: Arc<MockLlm>) -> TaxonomyPlannerNode {
        let prompts = Arc::new(Prompts::embedded().unwrap());
        let team = Arc::new(Team {
            name: "Hedgebox".into(),
            group_types: vec!["organization".into()],
            ..Default::default()
        });
        let taxonomy = InMemoryTaxonomy::default().with_events([("$pageview", 100), ("signed_up", 40)]);
        let toolkit = Arc::new(TaxonomyToolkit::new(Arc::new(taxonomy), &team));
        TaxonomyPlannerNode::new(
            "trends_planner",
            prompts.insights.trends.planner_system.clone(),
            prompts.clone(),
            llm,
            toolkit,
            team,
            Arc::new(InMemoryCoreMemory::new()),
        )
    }

    fn state() -> AssistantState {
        AssistantState {
            messages: vec![AssistantMessage::Human {
                id: "h1".into(),
                content: "show me signups trend".into(),
            }],
            start_id: Some("h1".into()),
            root_tool_call_id: Some("call-1".into()),
            ..Default::default()
        }
    }

    /// **Scenario**: A parsed action is appended as a pending step; the prompt carries events, tools and the question.
    #[tokio::test]
    async fn appends_parsed_action() {
        let llm = Arc::new(MockLlm::new().with_text(
            "Thought: look at signed_up\nAction:\n```json\n{\"action\": \"retrieve_event_properties\", \"action_input\": \"signed_up\"}\n```",
        ));
        let node = planner(llm.clone());
        let update = node.run(&state()).await.unwrap();
        let steps = update.intermediate_steps.unwrap();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].0.tool, "retrieve_event_properties");
        assert!(steps[0].1.is_none());

        let calls = llm.calls();
        let prompt: String = calls[0].messages.iter().map(|m| m.content()).collect::<Vec<_>>().join("\n");
        assert!(prompt.contains("<name>signed_up</name>"));
        assert!(prompt.contains("retrieve_entity_property_values"));
        assert!(prompt.contains("show me signups trend"));
        assert!(prompt.contains("Hedgebox"));
        assert!(calls[0].tool_names.is_empty());
    }

    /// **Scenario**: Missing `Action:` yields one corrective step whose log holds the output plus the correction.
    #[tokio::test]
    async fn missing_action_produces_correction() {
        let llm = Arc::new(MockLlm::new().with_text("I should look at pageviews."));
        let node = planner(llm);
        let update = node.run(&state()).await.unwrap();
        let steps = update.intermediate_steps.unwrap();
        assert_eq!(steps.len(), 1);
        let (action, observation) = &steps[0];
        assert_eq!(action.tool, HANDLE_INCORRECT_RESPONSE);
        assert!(observation.is_none());
        assert!(action.log.starts_with("I should look at pageviews."));
        assert!(action.log.contains("I didn't output the `Action:` block."));
        assert!(action
            .tool_input
            .as_str()
            .unwrap()
            .contains("didn't output the `Action:` block"));
    }

    /// **Scenario**: Invalid JSON in the action block uses the malformed-JSON template, not the missing-action one.
    #[tokio::test]
    async fn malformed_json_produces_generic_correction() {
        let output = "Thought: x\nAction:\n```\n{\"action\": \"final_answer\", \"action_input\": }\n```";
        let llm = Arc::new(MockLlm::new().with_text(output));
        let update = planner(llm).run(&state()).await.unwrap();
        let (action, _) = &update.intermediate_steps.unwrap()[0];
        assert_eq!(action.tool, HANDLE_INCORRECT_RESPONSE);
        assert_eq!(action.log, output);
        let instruction = action.tool_input.as_str().unwrap();
        assert!(instruction.contains("malformed JSON"));
        assert!(!instruction.contains("`Action:` block"));
    }

    /// **Scenario**: Past the correction bound the turn fails instead of looping.
    #[tokio::test]
    async fn correction_bound_fails_turn() {
        let llm = Arc::new(MockLlm::new().with_text("still no action"));
        let node = planner(llm).with_max_parse_corrections(1);
        let mut s = state();
        s.intermediate_steps = vec![(
            AgentAction::incorrect_response("fix it", "bad"),
            Some("fix it".into()),
        )];
        let err = node.run(&s).await.unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed(m) if m.contains("could not be parsed")));
    }

    /// **Scenario**: Unknown tools and invalid arguments count toward the correction bound like unparseable output.
    #[tokio::test]
    async fn unusable_actions_count_toward_bound() {
        let unknown = "Action:\n```json\n{\"action\": \"summon_data\", \"action_input\": \"x\"}\n```";
        let llm = Arc::new(MockLlm::new().with_text(unknown));
        let node = planner(llm).with_max_parse_corrections(2);
        let mut s = state();
        s.intermediate_steps = vec![
            (
                AgentAction::new("retrieve_event_property_values", json!("not an object"), "log one"),
                Some("invalid arguments".into()),
            ),
            (AgentAction::new("nope", json!("x"), "log two"), Some("no such tool".into())),
        ];
        let err = node.run(&s).await.unwrap_err();
        assert!(matches!(err, AgentError::ExecutionFailed(m) if m.contains("could not be parsed")));
    }

    /// **Scenario**: A successful tool step resets the correction count.
    #[tokio::test]
    async fn executed_tool_step_resets_bound() {
        let llm = Arc::new(MockLlm::new().with_text("still no action"));
        let node = planner(llm).with_max_parse_corrections(1);
        let mut s = state();
        s.intermediate_steps = vec![
            (AgentAction::new("nope", json!("x"), "log one"), Some("no such tool".into())),
            (
                AgentAction::new("retrieve_event_properties", json!("signed_up"), "log two"),
                Some("$browser".into()),
            ),
        ];
        let update = node.run(&s).await.unwrap();
        let steps = update.intermediate_steps.unwrap();
        assert_eq!(steps.last().unwrap().0.tool, HANDLE_INCORRECT_RESPONSE);
    }

    /// **Scenario**: The events lookup runs once per node instance.
    #[tokio::test]
    async fn events_prompt_is_memoized() {
        let action = "Action:\n```\n{\"action\": \"final_answer\", \"action_input\": \"plan\"}\n```";
        let llm = Arc::new(MockLlm::new().with_text(action).with_text(action));
        let node = planner(llm);
        node.run(&state()).await.unwrap();
        assert!(node.events_prompt.initialized());
        let first = node.events_prompt.get().cloned();
        node.run(&state()).await.unwrap();
        assert_eq!(node.events_prompt.get().cloned(), first);
    }

    /// **Scenario**: Only executed steps appear in the scratchpad, each followed by a Thought prefix.
    #[test]
    fn scratchpad_skips_pending_steps() {
        let steps = vec![
            (AgentAction::new("a", "x".into(), "log one"), Some("obs one".to_string())),
            (AgentAction::new("b", "y".into(), "log two"), None),
        ];
        assert_eq!(render_scratchpad(&steps), "log one\nObservation: obs one\nThought: ");
    }

    /// **Scenario**: The router fails on an empty scratchpad and routes to tools otherwise.
    #[test]
    fn router_requires_pending_step() {
        assert!(TaxonomyPlannerNode::router(&AssistantState::default()).is_err());
        let mut s = state();
        s.intermediate_steps = vec![(AgentAction::new("a", "x".into(), "l"), None)];
        assert_eq!(TaxonomyPlannerNode::router(&s).unwrap(), PlannerRoute::Tools);
    }
}
