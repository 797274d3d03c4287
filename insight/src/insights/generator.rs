//! Query generators: turn a plan into a typed insight query.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use super::query::{InsightKind, InsightQuery};
use crate::error::AgentError;
use crate::graph::Node;
use crate::llm::LlmClient;
use crate::message::{merge_message_runs, Message};
use crate::prompts::{render, Prompts};
use crate::state::{
    new_message_id, AgentAction, AssistantMessage, AssistantState, PartialAssistantState,
};
use crate::taxonomy::{filter_and_merge_messages, slice_messages_to_conversation_start};

/// Generation attempts per plan, the first one included.
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: usize = 2;

crate::route_labels! {
    pub enum GeneratorRoute {
        Tools => "tools",
        Next => "next",
    }
}

/// Generator node for one insight family.
///
/// A valid answer becomes a `Visualization` message. An invalid one becomes a
/// corrective step whose input is the validation error; once the attempts run out a
/// `Failure` message is emitted instead.
pub struct SchemaGeneratorNode {
    id: String,
    kind: InsightKind,
    prompts: Arc<Prompts>,
    llm: Arc<dyn LlmClient>,
    max_attempts: usize,
}

impl SchemaGeneratorNode {
    pub fn new(
        id: impl Into<String>,
        kind: InsightKind,
        prompts: Arc<Prompts>,
        llm: Arc<dyn LlmClient>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            prompts,
            llm,
            max_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max: usize) -> Self {
        self.max_attempts = max.max(1);
        self
    }

    pub fn router(state: &AssistantState) -> GeneratorRoute {
        if state.intermediate_steps.is_empty() {
            GeneratorRoute::Next
        } else {
            GeneratorRoute::Tools
        }
    }

    fn build_messages(&self, state: &AssistantState) -> Vec<Message> {
        let insights = &self.prompts.insights;
        let start_id = state.start_id.as_deref();
        let seed = state.root_tool_insight_plan.as_deref().filter(|s| !s.is_empty());
        let mut messages = vec![Message::system(
            insights.family(self.kind).generator_system.clone(),
        )];

        let history = filter_and_merge_messages(slice_messages_to_conversation_start(
            &state.messages,
            start_id,
        ));
        let mut has_visualization = false;
        for message in &history {
            match message {
                AssistantMessage::Human { id, content } => {
                    let question = match seed {
                        Some(seed) if start_id == Some(id.as_str()) => seed,
                        _ => content.as_str(),
                    };
                    messages.push(Message::user(render(
                        &insights.generator_question,
                        &[("question", question)],
                    )));
                }
                AssistantMessage::Visualization { plan, answer, .. } => {
                    has_visualization = true;
                    messages.push(Message::user(render(
                        &insights.generator_plan,
                        &[("plan", plan.as_deref().unwrap_or_default())],
                    )));
                    let answer = answer
                        .as_ref()
                        .and_then(|a| serde_json::to_string(a).ok())
                        .unwrap_or_default();
                    messages.push(Message::assistant(answer));
                }
                _ => {}
            }
        }

        let plan_template = if has_visualization {
            &insights.generator_new_plan
        } else {
            &insights.generator_plan
        };
        messages.push(Message::user(render(
            plan_template,
            &[("plan", state.plan.as_deref().unwrap_or_default())],
        )));

        for (action, observation) in &state.intermediate_steps {
            if let Some(observation) = observation {
                messages.push(Message::assistant(action.log.clone()));
                messages.push(Message::user(render(
                    &insights.generator_failover,
                    &[("validation_error_message", observation)],
                )));
            }
        }
        merge_message_runs(messages)
    }
}

/// Extracts the `answer` of a `{"reasoning_steps": [...], "answer": {...}}` reply,
/// tolerating code fences around the JSON.
pub fn parse_generator_output(kind: InsightKind, text: &str) -> Result<InsightQuery, String> {
    let json = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Err("the response does not contain a JSON object".into()),
    };
    let mut output: Value = serde_json::from_str(json).map_err(|e| e.to_string())?;
    let Some(mut answer) = output.get_mut("answer").map(Value::take) else {
        return Err("the response is missing the `answer` field".into());
    };
    if let Some(object) = answer.as_object_mut() {
        object
            .entry("kind")
            .or_insert_with(|| Value::String(kind.as_str().to_string()));
    }
    InsightQuery::parse_for(kind, answer)
}

#[async_trait]
impl Node<AssistantState> for SchemaGeneratorNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let messages = self.build_messages(state);
        let response = self.llm.invoke(&messages, &[]).await?;
        match parse_generator_output(self.kind, &response.content) {
            Ok(query) => {
                debug!(node = %self.id, kind = %self.kind, "generated query");
                Ok(PartialAssistantState::default()
                    .with_messages(vec![AssistantMessage::Visualization {
                        id: new_message_id(),
                        plan: state.plan.clone(),
                        answer: Some(query),
                        initiator: state.start_id.clone(),
                    }])
                    .with_intermediate_steps(Vec::new()))
            }
            Err(error) => {
                let attempt = state.intermediate_steps.len() + 1;
                warn!(node = %self.id, attempt, error = %error, "generated query failed validation");
                if attempt >= self.max_attempts {
                    return Ok(PartialAssistantState::default()
                        .with_messages(vec![AssistantMessage::Failure {
                            id: new_message_id(),
                            content: None,
                        }])
                        .with_intermediate_steps(Vec::new()));
                }
                let mut steps = state.intermediate_steps.clone();
                steps.push((AgentAction::incorrect_response(error, response.content), None));
                Ok(PartialAssistantState::default().with_intermediate_steps(steps))
            }
        }
    }
}

/// Turns the generator's corrective step into an observation and loops back.
pub struct SchemaGeneratorToolsNode {
    id: String,
}

impl SchemaGeneratorToolsNode {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[async_trait]
impl Node<AssistantState> for SchemaGeneratorToolsNode {
    fn id(&self) -> &str {
        &self.id
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let Some(((action, None), executed)) = state.intermediate_steps.split_last() else {
            return Err(AgentError::ExecutionFailed(format!(
                "{}: no pending correction",
                self.id
            )));
        };
        let observation = match &action.tool_input {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let mut steps = executed.to_vec();
        steps.push((action.clone(), Some(observation)));
        Ok(PartialAssistantState::default().with_intermediate_steps(steps))
    }
}
