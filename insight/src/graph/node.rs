//! Graph node trait: one step in a StateGraph.
//!
//! Receives a read-only view of state `S`, returns a delta (`S::Update`). The
//! compiled graph applies the delta with [`GraphState::apply`] and then follows the
//! node's outgoing edge or router. Nodes never mutate state in place.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::error::AgentError;

/// State that flows through a graph and is updated by merging deltas.
///
/// `Update` is what a node returns; `apply` merges it into the current state. The
/// merge is deterministic, so replaying the same deltas reproduces the same state.
pub trait GraphState: Clone + Send + Sync + Debug + 'static {
    /// Delta produced by one node step.
    type Update: Clone + Send + Sync + Debug + 'static;

    /// Merges one node's delta into the state.
    fn apply(&mut self, update: Self::Update);
}

/// One step in a graph: state in, delta out.
///
/// **Interaction**: Registered via `StateGraph::add_node`; run by
/// `CompiledStateGraph::invoke`. Routing is declared on the graph, not returned here.
#[async_trait]
pub trait Node<S>: Send + Sync
where
    S: GraphState,
{
    /// Node id (e.g. `"trends_planner"`). Must be unique within a graph.
    fn id(&self) -> &str;

    /// One step: read the state, return the delta to merge.
    async fn run(&self, state: &S) -> Result<S::Update, AgentError>;
}
