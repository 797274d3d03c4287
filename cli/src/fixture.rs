//! JSON fixture standing in for the analytics backend: team facts, taxonomy and
//! canned query results.
//!
//! ```json
//! {
//!   "team": { "name": "Shop", "timezone": "UTC", "app_urls": ["shop.example.com"] },
//!   "taxonomy": { "events": [{ "event": "signed_up", "count": 540 }] },
//!   "queries": { "results": { "trends": [{ "label": "signed_up", "data": [4, 6] }] } },
//!   "core_memory": { "text": "Sells shoes.", "scraping_status": "completed" }
//! }
//! ```

use std::path::{Path, PathBuf};

use insight::{CoreMemory, InMemoryQueryRunner, InMemoryTaxonomy, Team};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FixtureError {
    #[error("read fixture {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse fixture {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Every section is optional; a missing one is empty.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Fixture {
    pub team: Team,
    pub taxonomy: InMemoryTaxonomy,
    pub queries: InMemoryQueryRunner,
    /// Seeds core memory when no memory file exists yet.
    pub core_memory: Option<CoreMemory>,
}

impl Fixture {
    pub fn from_file(path: &Path) -> Result<Self, FixtureError> {
        let raw = std::fs::read_to_string(path).map_err(|source| FixtureError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw).map_err(|source| FixtureError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_json(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}
