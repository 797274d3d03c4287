//! SQLite-backed checkpointer (SqliteSaver). Persistent across process restarts.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};

use crate::memory::checkpoint::{
    Checkpoint, CheckpointListItem, CheckpointMetadata, CheckpointSource, CHECKPOINT_VERSION,
};
use crate::memory::checkpointer::{window, CheckpointError, Checkpointer};
use crate::memory::config::RunnableConfig;
use crate::memory::serializer::Serializer;

fn storage(e: impl std::fmt::Display) -> CheckpointError {
    CheckpointError::Storage(e.to_string())
}

fn created_at_to_i64(t: &Option<SystemTime>) -> Option<i64> {
    t.as_ref()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
}

fn i64_to_created_at(v: Option<i64>) -> Option<SystemTime> {
    v.and_then(|ms| UNIX_EPOCH.checked_add(Duration::from_millis(ms as u64)))
}

fn metadata_from(source: &str, step: i64, created_at: Option<i64>, next: Option<String>) -> CheckpointMetadata {
    CheckpointMetadata {
        source: CheckpointSource::parse(source),
        step,
        created_at: i64_to_created_at(created_at),
        next,
    }
}

const SELECT_COLUMNS: &str =
    "checkpoint_id, ts, payload, metadata_source, metadata_step, metadata_created_at, metadata_next";

type RowData = (String, String, Vec<u8>, String, i64, Option<i64>, Option<String>);

fn read_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RowData> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
    ))
}

/// SQLite-backed checkpointer. Key: (thread_id, checkpoint_ns, checkpoint_id).
///
/// Rows carry an autoincrement `seq` so "latest" is insertion order, independent of
/// clock resolution. Blocking I/O runs on `spawn_blocking`.
///
/// **Interaction**: Used as `Arc<dyn Checkpointer<S>>` in StateGraph::compile_with_checkpointer.
pub struct SqliteSaver<S> {
    db_path: PathBuf,
    serializer: Arc<dyn Serializer<S>>,
}

impl<S> SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    /// Opens (or creates) the database and ensures the table exists.
    pub fn new(
        path: impl AsRef<Path>,
        serializer: Arc<dyn Serializer<S>>,
    ) -> Result<Self, CheckpointError> {
        let db_path = path.as_ref().to_path_buf();
        let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS checkpoints (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                thread_id TEXT NOT NULL,
                checkpoint_ns TEXT NOT NULL,
                checkpoint_id TEXT NOT NULL,
                ts TEXT NOT NULL,
                payload BLOB NOT NULL,
                metadata_source TEXT NOT NULL,
                metadata_step INTEGER NOT NULL,
                metadata_created_at INTEGER,
                metadata_next TEXT,
                UNIQUE (thread_id, checkpoint_ns, checkpoint_id)
            )
            "#,
            [],
        )
        .map_err(storage)?;
        Ok(Self {
            db_path,
            serializer,
        })
    }

    fn thread_id_required(config: &RunnableConfig) -> Result<String, CheckpointError> {
        config
            .thread_id
            .clone()
            .ok_or(CheckpointError::ThreadIdRequired)
    }
}

#[async_trait]
impl<S> Checkpointer<S> for SqliteSaver<S>
where
    S: Clone + Send + Sync + 'static,
{
    async fn put(
        &self,
        config: &RunnableConfig,
        checkpoint: &Checkpoint<S>,
    ) -> Result<String, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let payload = self.serializer.serialize(&checkpoint.channel_values)?;
        let source = checkpoint.metadata.source.as_str();
        let step = checkpoint.metadata.step;
        let created_at = created_at_to_i64(&checkpoint.metadata.created_at);
        let next = checkpoint.metadata.next.clone();
        let id = checkpoint.id.clone();
        let ts = checkpoint.ts.clone();

        let db_path = self.db_path.clone();
        tokio::task::spawn_blocking(move || {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            conn.execute(
                r#"
                INSERT OR REPLACE INTO checkpoints
                (thread_id, checkpoint_ns, checkpoint_id, ts, payload,
                 metadata_source, metadata_step, metadata_created_at, metadata_next)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
                params![thread_id, checkpoint_ns, id, ts, payload, source, step, created_at, next],
            )
            .map_err(storage)?;
            Ok::<String, CheckpointError>(id)
        })
        .await
        .map_err(storage)?
    }

    async fn get_tuple(
        &self,
        config: &RunnableConfig,
    ) -> Result<Option<(Checkpoint<S>, CheckpointMetadata)>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let want_id = config.checkpoint_id.clone();
        let db_path = self.db_path.clone();

        let row = tokio::task::spawn_blocking(move || -> Result<Option<RowData>, CheckpointError> {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            let found = match want_id {
                Some(cid) => conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM checkpoints
                             WHERE thread_id = ?1 AND checkpoint_ns = ?2 AND checkpoint_id = ?3",
                            SELECT_COLUMNS
                        ),
                        params![thread_id, checkpoint_ns, cid],
                        read_row,
                    )
                    .optional(),
                None => conn
                    .query_row(
                        &format!(
                            "SELECT {} FROM checkpoints
                             WHERE thread_id = ?1 AND checkpoint_ns = ?2
                             ORDER BY seq DESC LIMIT 1",
                            SELECT_COLUMNS
                        ),
                        params![thread_id, checkpoint_ns],
                        read_row,
                    )
                    .optional(),
            };
            found.map_err(storage)
        })
        .await
        .map_err(storage)??;

        let Some((id, ts, payload, source, step, created_at, next)) = row else {
            return Ok(None);
        };
        let channel_values = self.serializer.deserialize(&payload)?;
        let metadata = metadata_from(&source, step, created_at, next);
        let checkpoint = Checkpoint {
            v: CHECKPOINT_VERSION,
            id,
            ts,
            channel_values,
            metadata: metadata.clone(),
        };
        Ok(Some((checkpoint, metadata)))
    }

    async fn list(
        &self,
        config: &RunnableConfig,
        limit: Option<usize>,
        before: Option<&str>,
        after: Option<&str>,
    ) -> Result<Vec<CheckpointListItem>, CheckpointError> {
        let thread_id = Self::thread_id_required(config)?;
        let checkpoint_ns = config.checkpoint_ns.clone();
        let db_path = self.db_path.clone();

        let items = tokio::task::spawn_blocking(move || -> Result<Vec<CheckpointListItem>, CheckpointError> {
            let conn = rusqlite::Connection::open(&db_path).map_err(storage)?;
            let mut stmt = conn
                .prepare(
                    "SELECT checkpoint_id, metadata_source, metadata_step, metadata_created_at, metadata_next
                     FROM checkpoints WHERE thread_id = ?1 AND checkpoint_ns = ?2
                     ORDER BY seq ASC",
                )
                .map_err(storage)?;
            let rows = stmt
                .query_map(params![thread_id, checkpoint_ns], |row| {
                    let source: String = row.get(1)?;
                    Ok(CheckpointListItem {
                        checkpoint_id: row.get(0)?,
                        metadata: metadata_from(&source, row.get(2)?, row.get(3)?, row.get(4)?),
                    })
                })
                .map_err(storage)?;
            rows.collect::<Result<Vec<_>, _>>().map_err(storage)
        })
        .await
        .map_err(storage)??;

        Ok(window(items, limit, before, after))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::JsonSerializer;

    fn saver(dir: &tempfile::TempDir) -> SqliteSaver<Vec<String>> {
        SqliteSaver::new(dir.path().join("checkpoints.db"), Arc::new(JsonSerializer)).unwrap()
    }

    /// **Scenario**: put persists state and next node; a fresh saver on the same file reads them back.
    #[tokio::test]
    async fn sqlite_saver_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let config = RunnableConfig::for_thread("t1");
        {
            let s = saver(&dir);
            let mut cp = Checkpoint::from_state(vec!["hi".to_string()], CheckpointSource::Interrupt, 2);
            cp.metadata.next = Some("memory_initializer_interrupt".into());
            s.put(&config, &cp).await.unwrap();
        }
        let s = saver(&dir);
        let (cp, meta) = s.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(cp.channel_values, vec!["hi".to_string()]);
        assert_eq!(meta.source, CheckpointSource::Interrupt);
        assert_eq!(meta.next.as_deref(), Some("memory_initializer_interrupt"));
    }

    /// **Scenario**: Latest is by insertion order and list returns oldest first.
    #[tokio::test]
    async fn sqlite_saver_latest_and_list_order() {
        let dir = tempfile::tempdir().unwrap();
        let s = saver(&dir);
        let config = RunnableConfig::for_thread("t2");
        for i in 0..3 {
            let cp = Checkpoint::from_state(vec![i.to_string()], CheckpointSource::Loop, i);
            s.put(&config, &cp).await.unwrap();
        }
        let (cp, _) = s.get_tuple(&config).await.unwrap().unwrap();
        assert_eq!(cp.channel_values, vec!["2".to_string()]);

        let items = s.list(&config, None, None, None).await.unwrap();
        let steps: Vec<i64> = items.iter().map(|i| i.metadata.step).collect();
        assert_eq!(steps, vec![0, 1, 2]);
        assert_eq!(s.list(&config, Some(1), None, None).await.unwrap().len(), 1);
    }

    /// **Scenario**: Unknown thread returns None rather than an error.
    #[tokio::test]
    async fn sqlite_saver_unknown_thread_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let s = saver(&dir);
        assert!(s
            .get_tuple(&RunnableConfig::for_thread("nobody"))
            .await
            .unwrap()
            .is_none());
    }
}
