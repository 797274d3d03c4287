//! Graph compilation error.
//!
//! Returned by `StateGraph::compile` when the graph is misconfigured: no entry
//! edge, edges referencing unknown nodes, or a path map that does not cover every
//! label its router can return.

use thiserror::Error;

/// Error when compiling a state graph.
///
/// Every variant is a programming error in graph assembly, never a runtime condition.
#[derive(Debug, Error)]
pub enum CompilationError {
    /// A node id in an edge was not registered via `add_node` (and is not START/END).
    #[error("node not found: {0}")]
    NodeNotFound(String),

    /// No edge (plain or conditional) leaves START.
    #[error("Start node not added to the graph")]
    MissingStart,

    /// No edge or path map leads to END.
    #[error("graph has no path to END")]
    MissingEnd,

    /// More than one plain edge leaves the same node.
    #[error("node has more than one outgoing edge: {0}")]
    DuplicateEdge(String),

    /// A node has both an outgoing edge and conditional edges; it must have exactly one.
    #[error("node has both edge and conditional edges: {0}")]
    NodeHasBothEdgeAndConditional(String),

    /// A value in a conditional path_map is not a valid node id or END.
    #[error("conditional path_map invalid target: {0}")]
    InvalidConditionalPathMap(String),

    /// A label declared by the router's label type has no entry in the path map.
    #[error("path map of {node} has no destination for label {label:?}")]
    IncompletePathMap { node: String, label: String },

    /// A registered node has no outgoing edge at all.
    #[error("node has no outgoing edge: {0}")]
    DanglingNode(String),
}
