//! In-memory checkpointer (MemorySaver). Not persistent; for dev and tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::memory::checkpoint::{Checkpoint, CheckpointListItem, CheckpointMetadata};
use crate::memory::checkpointer::{window, CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;

/// In-memory checkpointer. Key: (thread_id, checkpoint_ns); each thread keeps its
/// checkpoints in insertion order, newest last.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<S>>` in StateGraph::compile_with_checkpointer.
pub struct MemorySaver<S> {
    by_thread: Arc<RwLock<HashMap<String, Vec<Checkpoint<S>>>>>,
}

impl<S> MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            by_thread: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn thread_key(config: &RunnableConfig) -> Result<String, CheckpointError> {
        let thread_id = config
            .thread_id
            .as_deref()
            .ok_or(CheckpointError::ThreadIdRequired)?;
        Ok(format!("{}:{}", thread_id, config.checkpoint_ns))
    }
}

impl<S> Default for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S> Checkpointer<S> for MemorySaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let key = Self::thread_key(config)?;
        let mut guard = self.by_thread.write().await;
        guard.entry(key).or_default().push(checkpoint.clone());
        Ok(checkpoint.id.clone())
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let key = Self::thread_key(config)?;
        let guard = self.by_thread.read().await;
        let Some(list) = guard.get(&key) else {
            return Ok(None);
        };
        let found = match &config.checkpoint_id {
            Some(cid) => list.iter().find(|cp| &cp.id == cid),
            None => list.last(),
        };
        Ok(found.map(|cp| (cp.clone(), cp.metadata.clone())))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let key = Self::thread_key(config)?;
        let guard = self.by_thread.read().await;
        let items = guard
            .get(&key)
            .map(|list| {
                list.iter()
                    .map(|cp| CheckpointListItem {
                        checkpoint_id: cp.id.clone(),
                        metadata: cp.metadata.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(window(items, limit, before, after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::CheckpointSource;

    fn thread(id: &str) -> RunnableConfig {
        RunnableConfig::for_thread(id)
    }

    /// **Scenario**: put then get_tuple returns the latest checkpoint; threads are isolated.
    #[tokio::test]
    async fn put_get_latest_per_thread() {
        let saver = MemorySaver::<String>::new();
        let a1 = Checkpoint::from_state("a1".to_string(), CheckpointSource::Loop, 1);
        let a2 = Checkpoint::from_state("a2".to_string(), CheckpointSource::Loop, 2);
        saver.put(&thread("a"), &a1).await.unwrap();
        saver.put(&thread("a"), &a2).await.unwrap();

        let (cp, meta) = saver.get_tuple(&thread("a")).await.unwrap().unwrap();
        assert_eq!(cp.channel_values, "a2");
        assert_eq!(meta.step, 2);
        assert!(saver.get_tuple(&thread("b")).await.unwrap().is_none());
    }

    /// **Scenario**: checkpoint_id in config selects an older checkpoint.
    #[tokio::test]
    async fn get_tuple_by_checkpoint_id() {
        let saver = MemorySaver::<String>::new();
        let first = Checkpoint::from_state("first".to_string(), CheckpointSource::Input, 0);
        saver.put(&thread("t"), &first).await.unwrap();
        saver
            .put(
                &thread("t"),
                &Checkpoint::from_state("second".to_string(), CheckpointSource::Loop, 1),
            )
            .await
            .unwrap();
        let config = RunnableConfig {
            checkpoint_id: Some(first.id.clone()),
            ..thread("t")
        };
        let (cp, _) = saver.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(cp.channel_values, "first");
    }

    /// **Scenario**: Missing thread_id is rejected.
    #[tokio::test]
    async fn put_without_thread_id_fails() {
        let saver = MemorySaver::<String>::new();
        let cp = Checkpoint::from_state("x".to_string(), CheckpointSource::Input, 0);
        let err = saver
            .put(&RunnableConfig::default(), &cp)
            .await
            .unwrap_err();
        assert!(matches!(err, CheckpointError::ThreadIdRequired));
    }
}
