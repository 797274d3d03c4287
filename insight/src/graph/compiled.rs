//! Compiled state graph: immutable, runs one node at a time.
//!
//! Built by `StateGraph::compile` or `compile_with_checkpointer`. Holds nodes, the
//! next-node map derived from edges, and an optional checkpointer. With a
//! checkpointer and `config.thread_id`, state is saved after every node transition
//! together with the node scheduled next, so an interrupted turn resumes exactly
//! where it stopped.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::AgentError;
use crate::memory::{Checkpoint, CheckpointSource, Checkpointer, RunnableConfig};

use super::logging::{
    log_graph_complete, log_graph_error, log_graph_interrupt, log_graph_start, log_node_complete,
    log_node_start, log_node_state, log_route,
};
use super::state_graph::{END, START};
use super::{GraphState, NextEntry, Node};

/// Latest persisted state of a thread.
///
/// `next` is the node that will run when the thread is resumed; `None` means the
/// last run reached END. `interrupted` is set only when the thread is paused by an
/// interrupt node; a `next` left behind by a failed run is not resumable.
#[derive(Debug, Clone)]
pub struct StateSnapshot<S> {
    pub values: S,
    pub next: Option<String>,
    pub checkpoint_id: String,
    pub step: i64,
    pub interrupted: bool,
}

/// Compiled graph: immutable structure.
///
/// Created by `StateGraph::compile()` or `compile_with_checkpointer()`. Execution is
/// single-threaded per invoke: each node sees the state produced by the previous one.
#[derive(Clone)]
pub struct CompiledStateGraph<S: GraphState> {
    pub(super) nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Map from node id (or START) to how to get the next node.
    pub(super) next_map: HashMap<String, NextEntry<S>>,
    pub(super) checkpointer: Option<Arc<dyn Checkpointer<S>>>,
}

impl<S: GraphState> CompiledStateGraph<S> {
    /// Resolves the node that follows `current` given the (already updated) state.
    fn next_after(&self, current: &str, state: &S) -> Result<String, AgentError> {
        match self.next_map.get(current) {
            Some(NextEntry::Unconditional(id)) => Ok(id.clone()),
            Some(NextEntry::Conditional(router)) => router.resolve_next(current, state),
            None => Err(AgentError::ExecutionFailed(format!(
                "no outgoing edge from {}",
                current
            ))),
        }
    }

    async fn save(
        &self,
        config: &RunnableConfig,
        state: &S,
        next: Option<&str>,
        source: CheckpointSource,
        step: i64,
    ) -> Result<(), AgentError> {
        if let (Some(cp), Some(_)) = (&self.checkpointer, &config.thread_id) {
            let mut checkpoint = Checkpoint::from_state(state.clone(), source, step);
            checkpoint.metadata.next = next.map(String::from);
            cp.put(config, &checkpoint).await?;
        }
        Ok(())
    }

    /// Steps through nodes from `current_id` until END, an error or an interrupt.
    async fn run_loop(
        &self,
        state: &mut S,
        config: &RunnableConfig,
        mut current_id: String,
    ) -> Result<(), AgentError> {
        log_graph_start(&current_id);
        let mut step: i64 = 0;

        loop {
            let node = self.nodes.get(&current_id).cloned().ok_or_else(|| {
                AgentError::ExecutionFailed(format!("node not found: {}", current_id))
            })?;

            log_node_start(&current_id, step);
            log_node_state(&current_id, &*state);

            let update = match node.run(&*state).await {
                Ok(update) => update,
                Err(AgentError::Interrupted(interrupt)) => {
                    // Persist the state before this node so the turn resumes here.
                    self.save(
                        config,
                        state,
                        Some(current_id.as_str()),
                        CheckpointSource::Interrupt,
                        step,
                    )
                    .await?;
                    log_graph_interrupt(&current_id);
                    return Err(AgentError::Interrupted(interrupt));
                }
                Err(e) => {
                    log_graph_error(&e);
                    return Err(e);
                }
            };

            log_node_complete(&current_id, &update);
            state.apply(update);
            step += 1;

            let next_id = match self.next_after(&current_id, state) {
                Ok(id) => id,
                Err(e) => {
                    log_graph_error(&e);
                    return Err(e);
                }
            };
            log_route(&current_id, &next_id);

            let next = (next_id != END).then_some(next_id.as_str());
            self.save(config, state, next, CheckpointSource::Loop, step)
                .await?;

            if next.is_none() {
                log_graph_complete(step);
                return Ok(());
            }
            current_id = next_id;
        }
    }

    /// Runs the graph with the given state.
    ///
    /// Starts at the node resolved from START (plain edge or conditional entry), or
    /// at `config.resume_from_node_id` when set. Returns the final state at END.
    /// Returns `AgentError::Interrupted` when an interrupt node pauses the turn.
    pub async fn invoke(&self, state: S, config: Option<RunnableConfig>) -> Result<S, AgentError> {
        let config = config.unwrap_or_default();
        let mut state = state;
        let first = match config.resume_from_node_id.as_ref() {
            Some(id) if self.nodes.contains_key(id) => id.clone(),
            Some(id) => {
                return Err(AgentError::ExecutionFailed(format!(
                    "cannot resume from unknown node: {}",
                    id
                )))
            }
            None => self.next_after(START, &state)?,
        };
        if first == END {
            log_graph_complete(0);
            return Ok(state);
        }

        self.run_loop(&mut state, &config, first).await?;
        Ok(state)
    }

    /// Returns the latest persisted snapshot for `config.thread_id`, if any.
    pub async fn get_state(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<StateSnapshot<S>>, AgentError> {
        let cp = self.checkpointer.as_ref().ok_or_else(|| {
            AgentError::ExecutionFailed("graph compiled without a checkpointer".into())
        })?;
        let tuple = cp.get_tuple(config).await?;
        Ok(tuple.map(|(checkpoint, metadata)| StateSnapshot {
            interrupted: metadata.source == CheckpointSource::Interrupt && metadata.next.is_some(),
            values: checkpoint.channel_values,
            next: metadata.next,
            checkpoint_id: checkpoint.id,
            step: metadata.step,
        }))
    }

    /// Applies `update` to the latest snapshot and persists the result, keeping the
    /// snapshot's `next` node so a pending resume is not lost. Updating a paused
    /// thread keeps it paused.
    pub async fn update_state(
        &self,
        config: &RunnableConfig,
        update: S::Update,
    ) -> Result<(), AgentError>
    where
        S: Default,
    {
        self.apply_and_save(config, update, true).await
    }

    /// Applies `update` to the latest snapshot and persists it with no next node, so
    /// the following invoke starts from START instead of resuming.
    pub async fn clear_pending(
        &self,
        config: &RunnableConfig,
        update: S::Update,
    ) -> Result<(), AgentError>
    where
        S: Default,
    {
        self.apply_and_save(config, update, false).await
    }

    async fn apply_and_save(
        &self,
        config: &RunnableConfig,
        update: S::Update,
        keep_next: bool,
    ) -> Result<(), AgentError>
    where
        S: Default,
    {
        if self.checkpointer.is_none() || config.thread_id.is_none() {
            return Err(AgentError::ExecutionFailed(
                "update_state requires a checkpointer and thread_id".into(),
            ));
        }
        let snapshot = self.get_state(config).await?;
        let (mut state, next, step, interrupted) = match snapshot {
            Some(s) => (s.values, s.next, s.step, s.interrupted),
            None => (S::default(), None, 0, false),
        };
        state.apply(update);
        let (next, source) = match (keep_next, interrupted) {
            (true, true) => (next, CheckpointSource::Interrupt),
            (true, false) => (next, CheckpointSource::Update),
            (false, _) => (None, CheckpointSource::Update),
        };
        self.save(config, &state, next.as_deref(), source, step).await
    }
}
