//! Assembles an [`Assistant`] from settings and a fixture.

use std::path::PathBuf;
use std::sync::Arc;

use insight::core_memory::MemoryStoreError;
use insight::llm::OpenAIConfig;
use insight::memory::CheckpointError;
use insight::prompts::{self, LoadError};
use insight::{
    Assistant, AssistantGraph, AssistantState, ChatOpenAI, GraphSettings, JsonSerializer, LlmClient,
    SqliteSaver, TurnError,
};
use insight_config::{AssistantSettings, SettingsError};
use thiserror::Error;
use tracing::debug;

use crate::fixture::{Fixture, FixtureError};
use crate::memory_file::FileCoreMemory;

#[derive(Debug, Error)]
pub enum RunError {
    #[error("settings: {0}")]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Fixture(#[from] FixtureError),
    #[error("prompts: {0}")]
    Prompts(#[from] LoadError),
    #[error("checkpoint store: {0}")]
    Checkpoint(#[from] CheckpointError),
    #[error("core memory: {0}")]
    Memory(#[from] MemoryStoreError),
    #[error("create {path}: {source}")]
    DataDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Turn(#[from] TurnError),
}

/// Inputs for [`build_assistant`] that do not come from the environment.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    pub fixture: Fixture,
    /// Core memory file; defaults to `core_memory.json` next to the checkpoint database.
    pub memory_file: Option<PathBuf>,
}

/// OpenAI-compatible client from the model, base url and key in `settings`.
pub fn openai_client(settings: &AssistantSettings) -> ChatOpenAI {
    let mut config = OpenAIConfig::new();
    if let Some(base) = &settings.base_url {
        config = config.with_api_base(base);
    }
    if let Some(key) = &settings.api_key {
        config = config.with_api_key(key);
    }
    ChatOpenAI::with_config(config, settings.model.clone())
}

/// Builds the assistant: SQLite checkpoints at `settings.checkpoint_db`, file-backed
/// core memory, and the fixture's team, taxonomy and query results.
pub async fn build_assistant(
    settings: &AssistantSettings,
    options: SessionOptions,
    llm: Arc<dyn LlmClient>,
) -> Result<Assistant, RunError> {
    let db = &settings.checkpoint_db;
    if let Some(parent) = db.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|source| RunError::DataDir {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    let checkpointer = SqliteSaver::<AssistantState>::new(db, Arc::new(JsonSerializer))?;

    let memory_path = options
        .memory_file
        .unwrap_or_else(|| db.with_file_name("core_memory.json"));
    let Fixture {
        team,
        taxonomy,
        queries,
        core_memory,
    } = options.fixture;
    let memory = FileCoreMemory::open(memory_path, core_memory).await?;
    debug!(db = %db.display(), memory = %memory.path().display(), "opened assistant stores");

    let graph = AssistantGraph::new(
        Arc::new(prompts::load(None)?),
        llm,
        Arc::new(team),
        Arc::new(taxonomy),
        Arc::new(queries),
        Arc::new(memory),
    )
    .with_settings(GraphSettings {
        max_parse_corrections: settings.max_parse_corrections,
        max_generation_attempts: settings.max_generation_attempts,
        max_root_tool_calls: settings.max_root_tool_calls,
    });
    Ok(Assistant::new(graph, Arc::new(checkpointer)))
}
