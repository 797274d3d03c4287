//! Root dispatcher: talks to the user and delegates to insight sub-agents or docs.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::core_memory::CoreMemoryStore;
use crate::error::AgentError;
use crate::graph::Node;
use crate::insights::InsightKind;
use crate::llm::{LlmClient, ToolCall, ToolSpec};
use crate::message::{merge_message_runs, Message};
use crate::prompts::{render, Prompts};
use crate::state::{new_message_id, AssistantMessage, AssistantState, PartialAssistantState};
use crate::team::Team;

pub const ROOT: &str = "root";
pub const ROOT_TOOLS: &str = "root_tools";

pub const CREATE_AND_QUERY_INSIGHT: &str = "create_and_query_insight";
pub const SEARCH_DOCUMENTATION: &str = "search_documentation";

/// Delegations allowed per turn.
pub const DEFAULT_MAX_ROOT_TOOL_CALLS: u32 = 4;

crate::route_labels! {
    /// Where root sends control after its tool calls were processed.
    pub enum RootRoute {
        Trends => "trends",
        Funnel => "funnel",
        Retention => "retention",
        Docs => "docs",
        Root => "root",
        End => "end",
    }
}

impl From<InsightKind> for RootRoute {
    fn from(kind: InsightKind) -> Self {
        match kind {
            InsightKind::Trends => RootRoute::Trends,
            InsightKind::Funnel => RootRoute::Funnel,
            InsightKind::Retention => RootRoute::Retention,
        }
    }
}

/// Native tools root may call.
pub fn root_tools() -> Vec<ToolSpec> {
    vec![
        ToolSpec {
            name: CREATE_AND_QUERY_INSIGHT.into(),
            description: Some(
                "Create an insight (trends, funnel or retention) that answers the user's data question, run it and return the results."
                    .into(),
            ),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "query_kind": {"type": "string", "enum": ["trends", "funnel", "retention"]},
                    "query_description": {
                        "type": "string",
                        "description": "What the insight should show: events, properties, filters and time range, in plain language."
                    }
                },
                "required": ["query_kind", "query_description"]
            }),
        },
        ToolSpec {
            name: SEARCH_DOCUMENTATION.into(),
            description: Some("Search the product documentation to answer how-to questions.".into()),
            input_schema: json!({"type": "object", "properties": {}}),
        },
    ]
}

#[derive(Debug, Deserialize)]
struct CreateAndQueryInsightArgs {
    query_kind: InsightKind,
    query_description: String,
}

/// Renders the committed conversation for root-level prompts.
///
/// Tool calls and tool results are written out as text; visualizations and failures
/// are represented by the tool results that follow them.
pub fn render_conversation(messages: &[AssistantMessage]) -> Vec<Message> {
    messages
        .iter()
        .filter_map(|message| match message {
            AssistantMessage::Human { content, .. } => Some(Message::user(content.clone())),
            AssistantMessage::Assistant {
                content, tool_calls, ..
            } => {
                let mut text = content.clone();
                for call in tool_calls {
                    if !text.is_empty() {
                        text.push('\n');
                    }
                    text.push_str(&format!("[called {} with {}]", call.name, call.arguments));
                }
                Some(Message::assistant(text))
            }
            AssistantMessage::ToolResult { content, .. } => {
                Some(Message::user(format!("[tool result]\n{}", content)))
            }
            AssistantMessage::Visualization { .. } | AssistantMessage::Failure { .. } => None,
        })
        .collect()
}

/// Root model step.
pub struct RootNode {
    prompts: Arc<Prompts>,
    llm: Arc<dyn LlmClient>,
    team: Arc<Team>,
    core_memory: Arc<dyn CoreMemoryStore>,
    max_tool_calls: u32,
}

impl RootNode {
    pub fn new(
        prompts: Arc<Prompts>,
        llm: Arc<dyn LlmClient>,
        team: Arc<Team>,
        core_memory: Arc<dyn CoreMemoryStore>,
    ) -> Self {
        Self {
            prompts,
            llm,
            team,
            core_memory,
            max_tool_calls: DEFAULT_MAX_ROOT_TOOL_CALLS,
        }
    }

    pub fn with_max_tool_calls(mut self, max: u32) -> Self {
        self.max_tool_calls = max;
        self
    }
}

#[async_trait]
impl Node<AssistantState> for RootNode {
    fn id(&self) -> &str {
        ROOT
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let root = &self.prompts.root;
        let memory = self
            .core_memory
            .get()
            .await
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
        let now = self.team.now();
        let mut messages = vec![Message::system(render(
            &root.root_system,
            &[
                ("project_name", &self.team.name),
                ("core_memory", &memory.text),
                ("project_datetime", &now),
                ("project_timezone", self.team.timezone_or_utc()),
            ],
        ))];
        messages.extend(render_conversation(&state.messages));

        let limit_reached = state.root_tool_calls_count >= self.max_tool_calls;
        let tools = if limit_reached {
            debug!(count = state.root_tool_calls_count, "root tool call limit reached");
            messages.push(Message::user(root.root_tool_limit.trim_end()));
            Vec::new()
        } else {
            root_tools()
        };

        let response = self.llm.invoke(&merge_message_runs(messages), &tools).await?;
        let tool_calls = if limit_reached {
            Vec::new()
        } else {
            response
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id.or_else(|| Some(format!("call_{}", new_message_id()))),
                    ..call
                })
                .collect()
        };
        Ok(PartialAssistantState::default().with_messages(vec![AssistantMessage::Assistant {
            id: new_message_id(),
            content: response.content,
            tool_calls,
        }]))
    }
}

/// Turns root's tool call into a delegation.
pub struct RootNodeTools {
    prompts: Arc<Prompts>,
}

impl RootNodeTools {
    pub fn new(prompts: Arc<Prompts>) -> Self {
        Self { prompts }
    }

    pub fn router(state: &AssistantState) -> RootRoute {
        if let Some(AssistantMessage::ToolResult { .. }) = state.last_message() {
            return RootRoute::Root;
        }
        if state.root_tool_call_id.is_some() {
            return match state.root_tool_insight_type {
                Some(kind) => kind.into(),
                None => RootRoute::Docs,
            };
        }
        RootRoute::End
    }

    fn invalid_call(&self, state: &AssistantState, call: &ToolCall, error: String) -> PartialAssistantState {
        warn!(tool = %call.name, error = %error, "invalid root tool call");
        PartialAssistantState {
            root_tool_calls_count: Some(state.root_tool_calls_count + 1),
            ..PartialAssistantState::reset()
        }
        .with_messages(vec![AssistantMessage::tool_result(
            call.id.clone(),
            render(&self.prompts.root.root_invalid_tool_call, &[("error", &error)]).trim_end(),
        )])
    }
}

#[async_trait]
impl Node<AssistantState> for RootNodeTools {
    fn id(&self) -> &str {
        ROOT_TOOLS
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let Some(AssistantMessage::Assistant { tool_calls, .. }) = state.last_message() else {
            return Ok(PartialAssistantState::reset());
        };
        let Some(call) = tool_calls.first() else {
            return Ok(PartialAssistantState::reset());
        };
        let count = Some(state.root_tool_calls_count + 1);
        match call.name.as_str() {
            CREATE_AND_QUERY_INSIGHT => {
                let args: CreateAndQueryInsightArgs = match serde_json::from_str(&call.arguments) {
                    Ok(args) => args,
                    Err(e) => return Ok(self.invalid_call(state, call, e.to_string())),
                };
                debug!(kind = %args.query_kind, "root delegates to insight");
                Ok(PartialAssistantState {
                    root_tool_call_id: call.id.clone(),
                    root_tool_insight_plan: Some(args.query_description),
                    root_tool_insight_type: Some(args.query_kind),
                    root_tool_calls_count: count,
                    ..PartialAssistantState::reset()
                })
            }
            SEARCH_DOCUMENTATION => {
                debug!("root delegates to docs search");
                Ok(PartialAssistantState {
                    root_tool_call_id: call.id.clone(),
                    root_tool_calls_count: count,
                    ..PartialAssistantState::reset()
                })
            }
            other => Ok(self.invalid_call(state, call, format!("unknown tool `{}`", other))),
        }
    }
}
