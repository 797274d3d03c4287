//! Turn-level error types.
//!
//! Returned by every graph node and by `CompiledStateGraph::invoke`. Collaborator
//! errors (taxonomy, query runner, memory store) are folded into `ExecutionFailed`
//! at the node boundary; the turn is reported as failed upstream.

use thiserror::Error;

use crate::graph::GraphInterrupt;
use crate::memory::CheckpointError;

/// Agent execution error.
///
/// Everything except `Interrupted` aborts the current turn. `Interrupted` is a
/// deliberate pause at a human-in-the-loop node; the state up to the last completed
/// node is persisted and the turn resumes from the interrupted node.
#[derive(Debug, Error)]
pub enum AgentError {
    /// Execution failed with a message (e.g. model call failed, invariant violated).
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// A router returned a label that has no destination in its path map.
    #[error("routing failed at {node}: label {label:?} not in path map")]
    Routing { node: String, label: String },

    /// Checkpoint persistence failed.
    #[error("checkpoint: {0}")]
    Checkpoint(#[from] CheckpointError),

    /// Graph execution was interrupted.
    ///
    /// Raised by interrupt nodes (e.g. memory initializer confirmation). The graph
    /// executor persists a checkpoint pointing at the interrupting node and returns
    /// this error to the caller.
    #[error("graph interrupted: {0}")]
    Interrupted(GraphInterrupt),
}

impl From<GraphInterrupt> for AgentError {
    fn from(interrupt: GraphInterrupt) -> Self {
        AgentError::Interrupted(interrupt)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Display format of ExecutionFailed contains "execution failed" and the message.
    #[test]
    fn agent_error_display_execution_failed() {
        let err = AgentError::ExecutionFailed("msg".to_string());
        let s = err.to_string();
        assert!(
            s.contains("execution failed"),
            "Display should contain 'execution failed': {}",
            s
        );
        assert!(s.contains("msg"), "Display should contain message: {}", s);
    }

    /// **Scenario**: Routing error names both the node and the offending label.
    #[test]
    fn agent_error_display_routing() {
        let err = AgentError::Routing {
            node: "trends_planner".into(),
            label: "bogus".into(),
        };
        let s = err.to_string();
        assert!(s.contains("trends_planner"), "{}", s);
        assert!(s.contains("bogus"), "{}", s);
    }

    /// **Scenario**: CheckpointError converts into AgentError::Checkpoint via `?`.
    #[test]
    fn checkpoint_error_converts() {
        let err: AgentError = CheckpointError::ThreadIdRequired.into();
        assert!(matches!(err, AgentError::Checkpoint(_)));
    }
}
