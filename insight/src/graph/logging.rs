//! Logging utilities for graph execution.
//!
//! Structured `tracing` events for graph start/complete, node execution, routing
//! decisions and interrupts.

use std::fmt::Debug;

/// Log node execution start.
pub fn log_node_start(node_id: &str, step: i64) {
    tracing::debug!(node_id = node_id, step, "Starting node execution");
}

/// Log the state at the start of node execution.
pub fn log_node_state<S: Debug>(node_id: &str, state: &S) {
    tracing::debug!(node_id = node_id, state = ?state, "Node execution: state");
}

/// Log node execution completion together with the delta it produced.
pub fn log_node_complete<U: Debug>(node_id: &str, update: &U) {
    tracing::debug!(node_id = node_id, update = ?update, "Node execution complete");
}

/// Log the routing decision taken after a node.
pub fn log_route(from: &str, to: &str) {
    tracing::debug!(from = from, to = to, "routing");
}

/// Log graph execution start.
pub fn log_graph_start(entry: &str) {
    tracing::info!(entry = entry, "Starting graph execution");
}

/// Log graph execution completion.
pub fn log_graph_complete(steps: i64) {
    tracing::info!(steps, "Graph execution complete");
}

/// Log a graph interrupt (not an error).
pub fn log_graph_interrupt(node_id: &str) {
    tracing::info!(node_id = node_id, "Graph interrupted; waiting for human input");
}

/// Log graph execution error.
pub fn log_graph_error(error: &crate::error::AgentError) {
    tracing::error!(?error, "Graph execution error");
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Every graph log helper runs without a subscriber installed.
    #[test]
    fn test_logging_functions() {
        // These should not panic
        log_node_start("test_node", 0);
        log_node_state("test_node", &());
        log_node_complete("test_node", &());
        log_route("a", "b");
        log_graph_start("a");
        log_graph_complete(1);
        log_graph_interrupt("a");
        log_graph_error(&crate::error::AgentError::ExecutionFailed(
            "test".to_string(),
        ));
    }
}
