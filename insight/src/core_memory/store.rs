//! Core memory persistence: durable product facts for one team.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum MemoryStoreError {
    #[error("core memory storage: {0}")]
    Storage(String),
}

/// Where memory initialization stands for the team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScrapingStatus {
    /// Research is under way; the user has not confirmed it yet.
    Pending,
    Completed,
    Skipped,
}

/// Memory text plus its initialization status.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreMemory {
    pub text: String,
    pub scraping_status: Option<ScrapingStatus>,
}

impl CoreMemory {
    /// Memory counts as initialized once the user completed or skipped onboarding.
    pub fn is_initialized(&self) -> bool {
        matches!(
            self.scraping_status,
            Some(ScrapingStatus::Completed) | Some(ScrapingStatus::Skipped)
        )
    }
}

/// Persistence collaborator for the team's core memory.
///
/// **Interaction**: Read when the assistant graph is built (onboarding gate, prompts)
/// and written by the onboarding, initializer and collector nodes.
#[async_trait]
pub trait CoreMemoryStore: Send + Sync {
    async fn get(&self) -> Result<CoreMemory, MemoryStoreError>;

    /// Replaces the memory text.
    async fn set(&self, text: &str) -> Result<(), MemoryStoreError>;

    /// Appends a fragment on a new line.
    async fn append(&self, fragment: &str) -> Result<(), MemoryStoreError>;

    /// Replaces the first occurrence of `original`; `false` if it is not in memory.
    async fn replace(&self, original: &str, new: &str) -> Result<bool, MemoryStoreError>;

    async fn set_scraping_status(&self, status: ScrapingStatus) -> Result<(), MemoryStoreError>;
}

/// Core memory held in memory. Not persistent.
#[derive(Default, Clone)]
pub struct InMemoryCoreMemory {
    inner: Arc<RwLock<CoreMemory>>,
}

impl InMemoryCoreMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_memory(memory: CoreMemory) -> Self {
        Self {
            inner: Arc::new(RwLock::new(memory)),
        }
    }
}

#[async_trait]
impl CoreMemoryStore for InMemoryCoreMemory {
    async fn get(&self) -> Result<CoreMemory, MemoryStoreError> {
        Ok(self.inner.read().await.clone())
    }

    async fn set(&self, text: &str) -> Result<(), MemoryStoreError> {
        self.inner.write().await.text = text.to_string();
        Ok(())
    }

    async fn append(&self, fragment: &str) -> Result<(), MemoryStoreError> {
        let mut memory = self.inner.write().await;
        if !memory.text.is_empty() {
            memory.text.push('\n');
        }
        memory.text.push_str(fragment);
        Ok(())
    }

    async fn replace(&self, original: &str, new: &str) -> Result<bool, MemoryStoreError> {
        let mut memory = self.inner.write().await;
        if original.is_empty() || !memory.text.contains(original) {
            return Ok(false);
        }
        memory.text = memory.text.replacen(original, new, 1);
        Ok(true)
    }

    async fn set_scraping_status(&self, status: ScrapingStatus) -> Result<(), MemoryStoreError> {
        self.inner.write().await.scraping_status = Some(status);
        Ok(())
    }
}
