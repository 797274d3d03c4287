//! Core memory persisted as a JSON file, so onboarding answers survive between runs.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use insight::core_memory::MemoryStoreError;
use insight::{CoreMemory, CoreMemoryStore, InMemoryCoreMemory, ScrapingStatus};

/// Writes through to `path` after every change. Reads are served from memory.
pub struct FileCoreMemory {
    path: PathBuf,
    cache: InMemoryCoreMemory,
}

fn storage(e: impl std::fmt::Display) -> MemoryStoreError {
    MemoryStoreError::Storage(e.to_string())
}

impl FileCoreMemory {
    /// Loads `path` if it exists, otherwise starts from `seed` (or empty memory).
    pub async fn open(path: impl Into<PathBuf>, seed: Option<CoreMemory>) -> Result<Self, MemoryStoreError> {
        let path = path.into();
        let initial = match tokio::fs::read_to_string(&path).await {
            Ok(raw) => serde_json::from_str(&raw).map_err(storage)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => seed.unwrap_or_default(),
            Err(e) => return Err(storage(e)),
        };
        Ok(Self {
            path,
            cache: InMemoryCoreMemory::with_memory(initial),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self) -> Result<(), MemoryStoreError> {
        let memory = self.cache.get().await?;
        let body = serde_json::to_vec_pretty(&memory).map_err(storage)?;
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(storage)?;
        }
        tokio::fs::write(&self.path, body).await.map_err(storage)
    }
}

#[async_trait]
impl CoreMemoryStore for FileCoreMemory {
    async fn get(&self) -> Result<CoreMemory, MemoryStoreError> {
        self.cache.get().await
    }

    async fn set(&self, text: &str) -> Result<(), MemoryStoreError> {
        self.cache.set(text).await?;
        self.flush().await
    }

    async fn append(&self, fragment: &str) -> Result<(), MemoryStoreError> {
        self.cache.append(fragment).await?;
        self.flush().await
    }

    async fn replace(&self, original: &str, new: &str) -> Result<bool, MemoryStoreError> {
        let replaced = self.cache.replace(original, new).await?;
        if replaced {
            self.flush().await?;
        }
        Ok(replaced)
    }

    async fn set_scraping_status(&self, status: ScrapingStatus) -> Result<(), MemoryStoreError> {
        self.cache.set_scraping_status(status).await?;
        self.flush().await
    }
}
