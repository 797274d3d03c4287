//! Query execution collaborator.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::insights::InsightQuery;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The engine refused the query (bad filter, unknown event...). Reported back to root.
    #[error("query rejected: {0}")]
    Rejected(String),
    /// The engine failed; the turn fails.
    #[error("query service failed: {0}")]
    Service(String),
}

/// Runs a generated query and returns the engine's raw JSON results.
#[async_trait]
pub trait QueryRunner: Send + Sync {
    async fn run(&self, query: &InsightQuery) -> Result<Value, QueryError>;
}

/// Canned results per insight kind (`trends`, `funnel`, `retention`).
///
/// **Interaction**: Test double and the CLI's fixture-backed runner. A kind without
/// results is rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InMemoryQueryRunner {
    pub results: HashMap<String, Value>,
    pub rejections: HashMap<String, String>,
}

impl InMemoryQueryRunner {
    pub fn with_results(mut self, kind: &str, results: Value) -> Self {
        self.results.insert(kind.to_string(), results);
        self
    }

    pub fn with_rejection(mut self, kind: &str, reason: impl Into<String>) -> Self {
        self.rejections.insert(kind.to_string(), reason.into());
        self
    }
}

#[async_trait]
impl QueryRunner for InMemoryQueryRunner {
    async fn run(&self, query: &InsightQuery) -> Result<Value, QueryError> {
        let kind = query.kind();
        if let Some(reason) = self.rejections.get(kind.as_str()) {
            return Err(QueryError::Rejected(reason.clone()));
        }
        self.results
            .get(kind.as_str())
            .cloned()
            .ok_or_else(|| QueryError::Rejected(format!("no results for {} queries", kind)))
    }
}
