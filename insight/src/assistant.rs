//! Assistant: runs one conversational turn per human message on a checkpointed thread.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::assistant_graph::AssistantGraph;
use crate::core_memory::should_run_onboarding;
use crate::error::AgentError;
use crate::graph::{CompilationError, CompiledStateGraph, GraphInterrupt, GraphState};
use crate::memory::{Checkpointer, RunnableConfig};
use crate::state::{AssistantMessage, AssistantState, PartialAssistantState};

#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    #[error("compilation failed: {0}")]
    Compilation(#[from] CompilationError),
    #[error(transparent)]
    Execution(#[from] AgentError),
}

/// What a turn produced.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    /// The turn reached END; `messages` are the ones added after the human message.
    Completed { messages: Vec<AssistantMessage> },
    /// The turn paused for a human reply. `messages` ends with `question`, which is
    /// also persisted in the thread.
    Interrupted {
        messages: Vec<AssistantMessage>,
        question: AssistantMessage,
    },
}

impl TurnOutcome {
    pub fn messages(&self) -> &[AssistantMessage] {
        match self {
            TurnOutcome::Completed { messages } | TurnOutcome::Interrupted { messages, .. } => messages,
        }
    }
}

/// Turn runner over a checkpointed assistant graph.
///
/// **Interaction**: Builds a graph per turn from `AssistantGraph`; the checkpointer
/// keys threads by `thread_id`.
pub struct Assistant {
    graph: AssistantGraph,
    checkpointer: Arc<dyn Checkpointer<AssistantState>>,
}

impl Assistant {
    pub fn new(graph: AssistantGraph, checkpointer: Arc<dyn Checkpointer<AssistantState>>) -> Self {
        Self { graph, checkpointer }
    }

    /// Runs one turn. An interrupted thread resumes at the interrupted node with
    /// `human` as the reply; otherwise a new turn starts from `human`. A failed turn
    /// is closed on the thread so the next message starts fresh.
    #[tracing::instrument(name = "turn", skip(self, human))]
    pub async fn run_turn(&self, thread_id: &str, human: &str) -> Result<TurnOutcome, TurnError> {
        let memory = self
            .graph
            .core_memory()
            .get()
            .await
            .map_err(|e| AgentError::ExecutionFailed(e.to_string()))?;
        let compiled = self
            .graph
            .compile(should_run_onboarding(&memory), Some(self.checkpointer.clone()))?;
        let mut config = RunnableConfig::for_thread(thread_id);

        let message = AssistantMessage::human(human);
        let snapshot = compiled.get_state(&config).await?;
        let (mut state, update) = match snapshot {
            Some(snapshot) if snapshot.interrupted => {
                debug!(thread_id, next = ?snapshot.next, "resuming interrupted turn");
                config.resume_from_node_id = snapshot.next;
                (
                    snapshot.values,
                    PartialAssistantState::default().with_messages(vec![message]),
                )
            }
            snapshot => {
                let update = PartialAssistantState {
                    start_id: Some(message.id().to_string()),
                    root_tool_calls_count: Some(0),
                    reset: true,
                    ..Default::default()
                }
                .with_messages(vec![message]);
                (snapshot.map(|s| s.values).unwrap_or_default(), update)
            }
        };
        state.apply(update);
        let seen = state.messages.len();

        match compiled.invoke(state, Some(config.clone())).await {
            Ok(state) => Ok(TurnOutcome::Completed {
                messages: state.messages.get(seen..).unwrap_or_default().to_vec(),
            }),
            Err(AgentError::Interrupted(GraphInterrupt(interrupt))) => {
                let question = serde_json::from_value::<AssistantMessage>(interrupt.value.clone())
                    .unwrap_or_else(|_| AssistantMessage::assistant(interrupt.value.to_string()));
                compiled
                    .update_state(
                        &config,
                        PartialAssistantState::default().with_messages(vec![question.clone()]),
                    )
                    .await?;
                info!(thread_id, reason = ?interrupt.reason, "turn interrupted");
                let messages = compiled
                    .get_state(&config)
                    .await?
                    .map(|s| s.values.messages.get(seen..).unwrap_or_default().to_vec())
                    .unwrap_or_else(|| vec![question.clone()]);
                Ok(TurnOutcome::Interrupted { messages, question })
            }
            Err(e) => {
                warn!(thread_id, error = %e, "turn failed");
                self.close_failed_turn(&compiled, &config).await;
                Err(e.into())
            }
        }
    }

    /// Drops the scratchpad and the pending node a failed run left behind.
    async fn close_failed_turn(
        &self,
        compiled: &CompiledStateGraph<AssistantState>,
        config: &RunnableConfig,
    ) {
        let pending = match compiled.get_state(config).await {
            Ok(snapshot) => snapshot.is_some_and(|s| s.next.is_some()),
            Err(e) => {
                warn!(error = %e, "could not read thread after failed turn");
                return;
            }
        };
        if !pending {
            return;
        }
        if let Err(e) = compiled.clear_pending(config, PartialAssistantState::reset()).await {
            warn!(error = %e, "could not reset thread after failed turn");
        }
    }
}
