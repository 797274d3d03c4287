//! # Insight
//!
//! A graph-orchestrated analytics assistant. One conversational turn is a run of a
//! state graph over [`AssistantState`]: nodes return deltas, routers pick the next
//! node from typed labels, and a checkpointer persists the state after every step.
//!
//! ## Turn shape
//!
//! - **Core memory**: onboarding and research (with a human confirmation interrupt),
//!   then a collector that edits durable product facts.
//! - **Root**: decides to answer, search the docs, or delegate an insight.
//! - **Insight families** (trends, funnel, retention): a ReAct taxonomy planner ⇄
//!   tools loop produces a plan; a generator turns it into a typed query; the query
//!   executor runs it and reports back to root.
//!
//! ## Main modules
//!
//! - [`graph`]: [`StateGraph`], [`CompiledStateGraph`], [`Node`], [`RouteLabel`].
//! - [`memory`]: [`Checkpointer`], [`MemorySaver`], [`SqliteSaver`].
//! - [`llm`]: [`LlmClient`], [`MockLlm`], [`ChatOpenAI`].
//! - [`taxonomy`]: ReAct parser, conversation reconstructor, toolkit, planner and tools nodes.
//! - [`assistant_graph`]: [`AssistantGraph`], the full turn assembly.
//! - [`assistant`]: [`Assistant::run_turn`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use insight::{
//!     Assistant, AssistantGraph, InMemoryCoreMemory, InMemoryQueryRunner, InMemoryTaxonomy,
//!     AssistantState, MemorySaver, MockLlm, Prompts, Team,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let graph = AssistantGraph::new(
//!     Arc::new(Prompts::embedded()?),
//!     Arc::new(MockLlm::new().with_text("Hello!")),
//!     Arc::new(Team::default()),
//!     Arc::new(InMemoryTaxonomy::default()),
//!     Arc::new(InMemoryQueryRunner::default()),
//!     Arc::new(InMemoryCoreMemory::new()),
//! );
//! let assistant = Assistant::new(graph, Arc::new(MemorySaver::<AssistantState>::new()));
//! let outcome = assistant.run_turn("thread-1", "hi").await?;
//! println!("{:?}", outcome.messages());
//! # Ok(())
//! # }
//! ```

pub mod assistant;
pub mod assistant_graph;
pub mod core_memory;
pub mod docs;
pub mod error;
pub mod graph;
pub mod insights;
pub mod llm;
pub mod memory;
pub mod message;
pub mod prompts;
pub mod query_executor;
pub mod root;
pub mod state;
pub mod taxonomy;
pub mod team;

pub use assistant::{Assistant, TurnError, TurnOutcome};
pub use assistant_graph::{AssistantGraph, GraphSettings};
pub use core_memory::{CoreMemory, CoreMemoryStore, InMemoryCoreMemory, ScrapingStatus};
pub use error::AgentError;
pub use graph::{
    CompilationError, CompiledStateGraph, GraphInterrupt, GraphState, Interrupt, Node,
    RouteLabel, StateGraph, StateSnapshot, END, START,
};
pub use insights::{InsightKind, InsightQuery};
pub use llm::{ChatOpenAI, LlmClient, LlmResponse, MockLlm, ToolCall, ToolSpec};
pub use memory::{Checkpointer, JsonSerializer, MemorySaver, RunnableConfig, SqliteSaver};
pub use message::Message;
pub use prompts::Prompts;
pub use query_executor::{InMemoryQueryRunner, QueryError, QueryRunner};
pub use state::{AssistantMessage, AssistantState, PartialAssistantState};
pub use taxonomy::{InMemoryTaxonomy, TaxonomyProvider};
pub use team::Team;

/// When running `cargo test -p insight`, initializes tracing from `RUST_LOG` so unit
/// tests in `src/**` can print logs with `--nocapture`.
#[cfg(test)]
mod test_logging {
    use ctor::ctor;
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::Layer;

    #[ctor]
    fn init() {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
        let _ = tracing_subscriber::registry()
            .with(
                tracing_subscriber::fmt::layer()
                    .with_test_writer()
                    .with_filter(filter),
            )
            .try_init();
    }
}
