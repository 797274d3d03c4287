//! Serializer for checkpoint state (state <-> bytes).
//!
//! Used by persistent checkpointers. MemorySaver keeps `Checkpoint<S>` values as-is.

use crate::memory::checkpointer::CheckpointError;

/// Serializes and deserializes state for checkpoint storage.
///
/// **Interaction**: Injected into SqliteSaver.
pub trait Serializer<S>: Send + Sync
where
    S: Clone + Send + Sync + 'static,
{
    fn serialize(&self, state: &S) -> Result<Vec<u8>, CheckpointError>;

    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError>;
}

/// JSON-based serializer. Requires S: Serialize + DeserializeOwned.
pub struct JsonSerializer;

impl<S> Serializer<S> for JsonSerializer
where
    S: Clone + Send + Sync + 'static + serde::Serialize + serde::de::DeserializeOwned,
{
    fn serialize(&self, state: &S) -> Result<Vec<u8>, CheckpointError> {
        serde_json::to_vec(state).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }

    fn deserialize(&self, bytes: &[u8]) -> Result<S, CheckpointError> {
        serde_json::from_slice(bytes).map_err(|e| CheckpointError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Thread {
        messages: Vec<String>,
        plan: Option<String>,
    }

    /// **Scenario**: Serialize then deserialize yields the same value.
    #[test]
    fn json_serializer_roundtrip() {
        let ser = JsonSerializer;
        let state = Thread {
            messages: vec!["hello".into()],
            plan: Some("Events:\n- $pageview".into()),
        };
        let bytes = ser.serialize(&state).unwrap();
        let restored: Thread = ser.deserialize(&bytes).unwrap();
        assert_eq!(state, restored);
    }

    /// **Scenario**: Invalid JSON on deserialize returns CheckpointError::Serialization.
    #[test]
    fn json_serializer_invalid_json_is_serialization_error() {
        let result: Result<Thread, _> = JsonSerializer.deserialize(b"{ not valid json ]");
        match result {
            Err(CheckpointError::Serialization(s)) => assert!(!s.is_empty()),
            other => panic!("expected Serialization variant: {:?}", other),
        }
    }
}
