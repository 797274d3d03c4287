//! State graph: nodes + explicit edges (from → to) and conditional edges.
//!
//! Add nodes with `add_node`, connect them with `add_edge(from, to)` using `START`
//! and `END` for entry/exit, and use `add_conditional_edges` to route on state.
//! The builder is a plain value consumed by `compile` / `compile_with_checkpointer`;
//! the result is an immutable `CompiledStateGraph`.
//!
//! # Conditional edges
//!
//! A router `(state) -> Result<L, AgentError>` returns a typed label `L:
//! RouteLabel`, mapped to a destination by the path map given at registration.
//! Compilation rejects a path map that misses any label of `L`, so an unroutable
//! label is caught while assembling the graph. A node has either one outgoing
//! `add_edge` or one `add_conditional_edges`, never both. START may use either.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::error::AgentError;
use crate::graph::compile_error::CompilationError;
use crate::graph::compiled::CompiledStateGraph;
use crate::graph::conditional::{ConditionalRouter, NextEntry, RouteLabel};
use crate::graph::node::{GraphState, Node};
use crate::memory::Checkpointer;

/// Sentinel for graph entry: use as `from_id` in `add_edge(START, first_node_id)`.
pub const START: &str = "__start__";

/// Sentinel for graph exit: use as `to_id` in `add_edge(last_node_id, END)`.
pub const END: &str = "__end__";

/// State graph: nodes plus explicit edges and conditional edges.
///
/// **Interaction**: Accepts `Arc<dyn Node<S>>`; produces `CompiledStateGraph<S>`.
pub struct StateGraph<S: GraphState> {
    nodes: HashMap<String, Arc<dyn Node<S>>>,
    /// Edges (from_id, to_id). `from_id` may be START.
    edges: Vec<(String, String)>,
    /// Conditional edges keyed by source node id (or START).
    conditional_edges: HashMap<String, ConditionalRouter<S>>,
}

impl<S: GraphState> Default for StateGraph<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: GraphState> StateGraph<S> {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: Vec::new(),
            conditional_edges: HashMap::new(),
        }
    }

    /// Adds a node; replaces any node registered under the same id.
    pub fn add_node(mut self, id: impl Into<String>, node: Arc<dyn Node<S>>) -> Self {
        self.nodes.insert(id.into(), node);
        self
    }

    /// Adds an edge from `from_id` to `to_id`. Use `START` / `END` for entry / exit.
    pub fn add_edge(mut self, from_id: impl Into<String>, to_id: impl Into<String>) -> Self {
        self.edges.push((from_id.into(), to_id.into()));
        self
    }

    /// Adds conditional edges from `source` (a node id or START).
    ///
    /// After `source` runs, `router` is called with the updated state; the label it
    /// returns selects the destination from `path_map`. Every label of `L` must have
    /// a destination, otherwise `compile` fails with `IncompletePathMap`.
    ///
    /// # Example
    ///
    /// ```rust,ignore
    /// graph.add_conditional_edges(
    ///     "planner_tools",
    ///     move |s: &AssistantState| Ok(tools.router(s)),
    ///     [
    ///         (ToolsRoute::Continue, "planner"),
    ///         (ToolsRoute::PlanFound, "generator"),
    ///         (ToolsRoute::Root, "root"),
    ///     ],
    /// )
    /// ```
    pub fn add_conditional_edges<L, F, T>(
        mut self,
        source: impl Into<String>,
        router: F,
        path_map: impl IntoIterator<Item = (L, T)>,
    ) -> Self
    where
        L: RouteLabel,
        F: Fn(&S) -> Result<L, AgentError> + Send + Sync + 'static,
        T: Into<String>,
    {
        let path_map = path_map.into_iter().map(|(l, t)| (l, t.into())).collect();
        self.conditional_edges
            .insert(source.into(), ConditionalRouter::new(router, path_map));
        self
    }

    /// Builds the executable graph without persistence.
    pub fn compile(self) -> Result<CompiledStateGraph<S>, CompilationError> {
        self.compile_internal(None)
    }

    /// Builds the executable graph bound to a checkpointer.
    ///
    /// When `invoke` is called with `config.thread_id`, state is persisted after every
    /// node transition and on interrupt.
    pub fn compile_with_checkpointer(
        self,
        checkpointer: Arc<dyn Checkpointer<S>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        self.compile_internal(Some(checkpointer))
    }

    fn compile_internal(
        self,
        checkpointer: Option<Arc<dyn Checkpointer<S>>>,
    ) -> Result<CompiledStateGraph<S>, CompilationError> {
        let start_edges: Vec<&String> = self
            .edges
            .iter()
            .filter(|(f, _)| f == START)
            .map(|(_, t)| t)
            .collect();
        let start_conditional = self.conditional_edges.get(START);
        if start_edges.is_empty() && start_conditional.is_none() {
            return Err(CompilationError::MissingStart);
        }

        let known = |id: &str| self.nodes.contains_key(id);
        for (from, to) in &self.edges {
            if from != START && !known(from) {
                return Err(CompilationError::NodeNotFound(from.clone()));
            }
            if to != END && !known(to) {
                return Err(CompilationError::NodeNotFound(to.clone()));
            }
        }

        let mut sources: Vec<&String> = self.conditional_edges.keys().collect();
        sources.sort();
        for source in sources {
            let router = &self.conditional_edges[source];
            if source != START && !known(source) {
                return Err(CompilationError::NodeNotFound(source.clone()));
            }
            if let Some(label) = router.missing_labels().first() {
                return Err(CompilationError::IncompletePathMap {
                    node: source.clone(),
                    label: label.to_string(),
                });
            }
            for target in router.path_map.values() {
                if target != END && !known(target) {
                    return Err(CompilationError::InvalidConditionalPathMap(target.clone()));
                }
            }
        }

        let mut edge_froms = HashSet::new();
        for (from, _) in &self.edges {
            if !edge_froms.insert(from.clone()) {
                return Err(CompilationError::DuplicateEdge(from.clone()));
            }
            if self.conditional_edges.contains_key(from) {
                return Err(CompilationError::NodeHasBothEdgeAndConditional(from.clone()));
            }
        }

        let mut ids: Vec<&String> = self.nodes.keys().collect();
        ids.sort();
        for id in ids {
            if !edge_froms.contains(id) && !self.conditional_edges.contains_key(id) {
                return Err(CompilationError::DanglingNode(id.clone()));
            }
        }

        let has_end = self.edges.iter().any(|(_, t)| t == END)
            || self
                .conditional_edges
                .values()
                .any(|r| r.path_map.values().any(|v| v == END));
        if !has_end {
            return Err(CompilationError::MissingEnd);
        }

        let mut next_map: HashMap<String, NextEntry<S>> = self
            .edges
            .into_iter()
            .map(|(f, t)| (f, NextEntry::Unconditional(t)))
            .collect();
        for (source, router) in self.conditional_edges {
            next_map.insert(source, NextEntry::Conditional(router));
        }

        Ok(CompiledStateGraph {
            nodes: self.nodes,
            next_map,
            checkpointer,
        })
    }
}
