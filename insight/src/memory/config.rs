//! Invoke config: thread_id, checkpoint_id, checkpoint_ns, resume node.
//!
//! Used by CompiledStateGraph::invoke and Checkpointer.

/// Config for a single invoke. Identifies the conversation thread and optional checkpoint.
///
/// When using a checkpointer, invoke must provide at least thread_id.
///
/// **Interaction**: Passed to `CompiledStateGraph::invoke(state, config)` and
/// `Checkpointer::put` / `get_tuple` / `list`.
#[derive(Debug, Clone, Default)]
pub struct RunnableConfig {
    /// Conversation identity. Required when using a checkpointer.
    pub thread_id: Option<String>,
    /// If set, load state from this checkpoint instead of the latest.
    pub checkpoint_id: Option<String>,
    /// Optional namespace for checkpoints. Default is empty.
    pub checkpoint_ns: String,
    /// When set, the graph starts from this node instead of the START entry
    /// (resume after an interrupt).
    pub resume_from_node_id: Option<String>,
}

impl RunnableConfig {
    /// Config for a conversation thread with defaults for everything else.
    pub fn for_thread(thread_id: impl Into<String>) -> Self {
        Self {
            thread_id: Some(thread_id.into()),
            ..Default::default()
        }
    }
}
