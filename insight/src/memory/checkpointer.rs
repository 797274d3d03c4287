//! Checkpointer trait and CheckpointError.
//!
//! Saves and loads checkpoints by (thread_id, checkpoint_ns, checkpoint_id).

use async_trait::async_trait;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata};
use crate::memory::config::RunnableConfig;

/// Error type for checkpoint operations.
///
/// Used by Checkpointer::put, get_tuple, list and by Serializer.
#[derive(Debug, thiserror::Error)]
pub enum CheckpointError {
    #[error("thread_id required")]
    ThreadIdRequired,
    #[error("serialization: {0}")]
    Serialization(String),
    #[error("storage: {0}")]
    Storage(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Saves and loads checkpoints by (thread_id, checkpoint_ns, checkpoint_id).
///
/// Implementations: `MemorySaver` (in-memory), `SqliteSaver` (persistent). Each
/// thread's checkpoints are append-only; the graph is the only writer during a turn.
///
/// **Interaction**: Injected at compile via StateGraph::compile_with_checkpointer;
/// CompiledStateGraph uses it when config.thread_id is set.
#[async_trait]
pub trait Checkpointer<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    /// Persist a checkpoint for the thread. Returns the checkpoint id used.
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError>;

    /// Load the latest checkpoint for the thread (or the one given by config.checkpoint_id).
    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError>;

    /// List checkpoints for the thread, oldest first.
    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError>;
}

/// Applies `after` / `before` / `limit` to a thread's checkpoint list (oldest first).
pub(crate) fn window(
    mut items: Vec<CheckpointListItem>,
    limit: Option<usize>,
    before: Option<&str>,
    after: Option<&str>,
) -> Vec<CheckpointListItem> {
    if let Some(a) = after {
        if let Some(pos) = items.iter().position(|i| i.checkpoint_id == a) {
            items = items.split_off(pos + 1);
        }
    }
    if let Some(b) = before {
        if let Some(pos) = items.iter().position(|i| i.checkpoint_id == b) {
            items.truncate(pos);
        }
    }
    if let Some(n) = limit {
        let len = items.len();
        if len > n {
            items = items.split_off(len - n);
        }
    }
    items
}
