//! State graph: nodes, plain and conditional edges, compile and invoke.
//!
//! StateGraph: add nodes and edges, compile (optionally with a checkpointer),
//! then invoke with state.

mod compile_error;
mod compiled;
mod conditional;
mod interrupt;
mod logging;
mod node;
mod state_graph;

pub use compile_error::CompilationError;
pub use compiled::{CompiledStateGraph, StateSnapshot};
pub use conditional::{ConditionalRouter, ConditionalRouterFn, NextEntry, RouteLabel};
pub use interrupt::{GraphInterrupt, Interrupt};
pub use logging::{
    log_graph_complete, log_graph_error, log_graph_interrupt, log_graph_start, log_node_complete,
    log_node_start, log_route,
};
pub use node::{GraphState, Node};
pub use state_graph::{StateGraph, END, START};
