//! Library half of the `insight` binary: fixture loading, file-backed core memory,
//! assistant assembly and terminal rendering. `main.rs` only parses arguments and
//! wires these together.

pub mod display;
pub mod fixture;
pub mod memory_file;
pub mod session;

pub use display::{outcome_json, render_message, render_outcome};
pub use fixture::{Fixture, FixtureError};
pub use memory_file::FileCoreMemory;
pub use session::{build_assistant, RunError, SessionOptions};
