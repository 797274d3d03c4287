//! Checkpointing: per-thread snapshots of graph state.
//!
//! `Checkpointer` stores a `Checkpoint<S>` after every node transition. Use
//! `MemorySaver` in tests and `SqliteSaver` (with `JsonSerializer`) for persistence.

mod checkpoint;
mod checkpointer;
mod config;
mod memory_saver;
mod serializer;
mod sqlite_saver;

pub use checkpoint::{
    Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource, CHECKPOINT_VERSION,
};
pub use checkpointer::{CheckpointError, Checkpointer};
pub use config::RunnableConfig;
pub use memory_saver::MemorySaver;
pub use serializer::{JsonSerializer, Serializer};
pub use sqlite_saver::SqliteSaver;
