//! Query executor: runs the generated query and reports the results to root.

mod format;
mod runner;

pub use format::{format_number, format_percentage, format_results};
pub use runner::{InMemoryQueryRunner, QueryError, QueryRunner};

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::AgentError;
use crate::graph::Node;
use crate::prompts::{render, Prompts};
use crate::state::{AssistantMessage, AssistantState, PartialAssistantState};

pub const QUERY_EXECUTOR: &str = "query_executor";

/// Runs the query of the last visualization and hands the results back to root.
///
/// The result text answers `root_tool_call_id` (or becomes an assistant message when
/// root did not delegate) and the delta resets the episode.
pub struct QueryExecutorNode {
    prompts: Arc<Prompts>,
    runner: Arc<dyn QueryRunner>,
}

impl QueryExecutorNode {
    pub fn new(prompts: Arc<Prompts>, runner: Arc<dyn QueryRunner>) -> Self {
        Self { prompts, runner }
    }

    async fn report(&self, state: &AssistantState) -> Result<String, AgentError> {
        let root = &self.prompts.root;
        let query = match state.last_message() {
            Some(AssistantMessage::Visualization {
                answer: Some(query), ..
            }) => query,
            Some(AssistantMessage::Visualization { answer: None, .. })
            | Some(AssistantMessage::Failure { .. }) => {
                return Ok(root.query_executor_failed.trim_end().to_string())
            }
            _ => {
                return Err(AgentError::ExecutionFailed(
                    "query executor expects a visualization or failure message".into(),
                ))
            }
        };
        match self.runner.run(query).await {
            Ok(results) => {
                debug!(kind = %query.kind(), "query executed");
                let table = format_results(query.kind(), &results);
                Ok(render(
                    &root.query_executor_results,
                    &[("query_kind", query.kind().as_str()), ("results", &table)],
                ))
            }
            Err(QueryError::Rejected(reason)) => {
                warn!(kind = %query.kind(), reason = %reason, "query rejected");
                Ok(render(&root.query_executor_rejected, &[("error", &reason)]))
            }
            Err(e @ QueryError::Service(_)) => Err(AgentError::ExecutionFailed(e.to_string())),
        }
    }
}

#[async_trait]
impl Node<AssistantState> for QueryExecutorNode {
    fn id(&self) -> &str {
        QUERY_EXECUTOR
    }

    async fn run(&self, state: &AssistantState) -> Result<PartialAssistantState, AgentError> {
        let content = self.report(state).await?;
        let content = content.trim_end();
        let message = match &state.root_tool_call_id {
            Some(id) => AssistantMessage::tool_result(Some(id.clone()), content),
            None => AssistantMessage::assistant(content),
        };
        Ok(PartialAssistantState::reset().with_messages(vec![message]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::{EventNode, InsightQuery, TrendsQuery};
    use serde_json::json;

    fn trends() -> InsightQuery {
        InsightQuery::Trends(TrendsQuery {
            series: vec![EventNode {
                event: Some("signed_up".into()),
                math: None,
                properties: vec![],
                custom_name: None,
            }],
            date_from: None,
            interval: None,
            breakdown: None,
            display: None,
        })
    }

    fn state(last: AssistantMessage) -> AssistantState {
        AssistantState {
            messages: vec![last],
            root_tool_call_id: Some("call-1".into()),
            plan: Some("plan".into()),
            ..Default::default()
        }
    }

    fn viz() -> AssistantMessage {
        AssistantMessage::Visualization {
            id: "v1".into(),
            plan: Some("plan".into()),
            answer: Some(trends()),
            initiator: None,
        }
    }

    fn node(runner: InMemoryQueryRunner) -> QueryExecutorNode {
        QueryExecutorNode::new(Arc::new(Prompts::embedded().unwrap()), Arc::new(runner))
    }

    /// **Scenario**: Results are formatted into a tool result for the root call, with a reset.
    #[tokio::test]
    async fn results_answer_root_tool_call() {
        let runner = InMemoryQueryRunner::default().with_results(
            "trends",
            json!([{"label": "signed_up", "days": ["2024-01-01"], "data": [4]}]),
        );
        let update = node(runner).run(&state(viz())).await.unwrap();
        assert!(update.reset);
        let AssistantMessage::ToolResult { tool_call_id, content, .. } = &update.messages[0] else {
            panic!("expected tool result");
        };
        assert_eq!(tool_call_id.as_deref(), Some("call-1"));
        assert!(content.contains("Date|signed_up\n2024-01-01|4"), "{}", content);
        assert!(content.contains("trends insight"));
    }

    /// **Scenario**: A rejected query is reported as text rather than failing the turn.
    #[tokio::test]
    async fn rejection_is_reported() {
        let runner = InMemoryQueryRunner::default().with_rejection("trends", "unknown event");
        let update = node(runner).run(&state(viz())).await.unwrap();
        let AssistantMessage::ToolResult { content, .. } = &update.messages[0] else {
            panic!("expected tool result");
        };
        assert!(content.contains("unknown event"));
    }

    /// **Scenario**: A generator failure is reported as "could not be generated" without running a query.
    #[tokio::test]
    async fn failure_message_is_reported() {
        let update = node(InMemoryQueryRunner::default())
            .run(&state(AssistantMessage::Failure {
                id: "f1".into(),
                content: None,
            }))
            .await
            .unwrap();
        let AssistantMessage::ToolResult { content, .. } = &update.messages[0] else {
            panic!("expected tool result");
        };
        assert!(content.contains("could not be generated"));
    }

    /// **Scenario**: Without a root tool call the report is an assistant message.
    #[tokio::test]
    async fn no_root_call_emits_assistant_message() {
        let runner = InMemoryQueryRunner::default().with_results("trends", json!([]));
        let mut s = state(viz());
        s.root_tool_call_id = None;
        let update = node(runner).run(&s).await.unwrap();
        assert!(matches!(&update.messages[0], AssistantMessage::Assistant { content, .. } if content.contains("[]")));
    }
}
