//! Checkpoint and metadata types.
//!
//! Checkpoint (id, ts, channel_values, metadata). `metadata.next` records the node
//! scheduled to run when the thread resumes.

use std::time::SystemTime;

use uuid::Uuid;

/// Current version of checkpoint format.
pub const CHECKPOINT_VERSION: u32 = 1;

/// Metadata for a single checkpoint.
#[derive(Debug, Clone, Default)]
pub struct CheckpointMetadata {
    /// Why the checkpoint was written.
    pub source: CheckpointSource,
    /// Number of node transitions in the run that wrote this checkpoint.
    pub step: i64,
    /// Timestamp when this checkpoint was created.
    pub created_at: Option<SystemTime>,
    /// Node to run on resume; `None` when the run reached END.
    pub next: Option<String>,
}

/// Source of the checkpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CheckpointSource {
    /// Seeded from caller input.
    #[default]
    Input,
    /// Written after a node transition.
    Loop,
    /// Written when a node interrupted the run.
    Interrupt,
    /// Written by a manual state update.
    Update,
}

impl CheckpointSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            CheckpointSource::Input => "input",
            CheckpointSource::Loop => "loop",
            CheckpointSource::Interrupt => "interrupt",
            CheckpointSource::Update => "update",
        }
    }

    /// Parses the stored name; unknown names read as `Update`.
    pub fn parse(s: &str) -> Self {
        match s {
            "input" => CheckpointSource::Input,
            "loop" => CheckpointSource::Loop,
            "interrupt" => CheckpointSource::Interrupt,
            _ => CheckpointSource::Update,
        }
    }
}

/// One checkpoint: state snapshot + id/ts + metadata.
///
/// Stored by Checkpointer keyed by (thread_id, checkpoint_ns, checkpoint_id).
///
/// **Interaction**: Produced by `CompiledStateGraph` after each node; consumed by
/// `Checkpointer::put`, returned by `get_tuple`.
#[derive(Debug, Clone)]
pub struct Checkpoint<S> {
    /// The version of the checkpoint format.
    pub v: u32,
    /// The ID of the checkpoint. Time-ordered (UUIDv7).
    pub id: String,
    /// Milliseconds since epoch, as a string.
    pub ts: String,
    /// The graph state at the time of the checkpoint.
    pub channel_values: S,
    pub metadata: CheckpointMetadata,
}

/// Item returned by Checkpointer::list for history.
#[derive(Debug, Clone)]
pub struct CheckpointListItem {
    pub checkpoint_id: String,
    pub metadata: CheckpointMetadata,
}

fn millis(now: SystemTime) -> String {
    format!(
        "{}",
        now.duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0)
    )
}

impl<S> Checkpoint<S> {
    /// Creates a checkpoint from current state with a fresh time-ordered id.
    ///
    /// - `source`: why the checkpoint is written
    /// - `step`: node transitions so far in this run
    pub fn from_state(state: S, source: CheckpointSource, step: i64) -> Self {
        Self::with_id(Uuid::now_v7().to_string(), state, source, step)
    }

    /// Creates a checkpoint with a specific ID.
    pub fn with_id(id: String, state: S, source: CheckpointSource, step: i64) -> Self {
        let now = SystemTime::now();
        Self {
            v: CHECKPOINT_VERSION,
            id,
            ts: millis(now),
            channel_values: state,
            metadata: CheckpointMetadata {
                source,
                step,
                created_at: Some(now),
                next: None,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// **Scenario**: Checkpoint ids are unique and sort in creation order.
    #[test]
    fn checkpoint_ids_are_time_ordered() {
        let cp1: Checkpoint<i32> = Checkpoint::from_state(1, CheckpointSource::Input, 0);
        let cp2: Checkpoint<i32> = Checkpoint::from_state(2, CheckpointSource::Loop, 1);
        assert_ne!(cp1.id, cp2.id);
        assert!(cp1.id < cp2.id, "{} should sort before {}", cp1.id, cp2.id);
        assert_eq!(cp1.v, CHECKPOINT_VERSION);
        assert!(cp2.metadata.next.is_none());
    }

    /// **Scenario**: Checkpoint with_id keeps the given id and step.
    #[test]
    fn checkpoint_with_custom_id() {
        let checkpoint: Checkpoint<String> = Checkpoint::with_id(
            "custom".to_string(),
            "state".to_string(),
            CheckpointSource::Update,
            5,
        );
        assert_eq!(checkpoint.id, "custom");
        assert_eq!(checkpoint.metadata.step, 5);
        assert_eq!(checkpoint.metadata.source, CheckpointSource::Update);
    }

    /// **Scenario**: CheckpointSource names parse back to the same variant.
    #[test]
    fn checkpoint_source_names_parse_back() {
        for s in [
            CheckpointSource::Input,
            CheckpointSource::Loop,
            CheckpointSource::Interrupt,
            CheckpointSource::Update,
        ] {
            assert_eq!(CheckpointSource::parse(s.as_str()), s);
        }
        assert_eq!(CheckpointSource::parse("???"), CheckpointSource::Update);
    }
}
