//! Checkpoint data model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// An immutable snapshot of component state at one point in time.
///
/// Sequence numbers are strictly increasing per instance and never
/// reused; the storage key is `"{instance_id}-checkpoint-{sequence}"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Engine instance this checkpoint belongs to
    pub instance_id: String,
    /// Strictly increasing sequence number
    pub sequence: u64,
    /// Wall-clock creation time
    pub created_at: DateTime<Utc>,
    /// Opaque state blobs keyed by component name
    pub components: HashMap<String, Value>,
    /// Free-form metadata (uptime, version, ...)
    pub metadata: HashMap<String, String>,
}

impl Checkpoint {
    /// Storage key for this checkpoint.
    pub fn key(&self) -> String {
        checkpoint_key(&self.instance_id, self.sequence)
    }
}

/// Build the storage key for an instance/sequence pair.
pub fn checkpoint_key(instance_id: &str, sequence: u64) -> String {
    format!("{}-checkpoint-{}", instance_id, sequence)
}

/// Extract the sequence number from a storage key.
pub fn parse_sequence(key: &str) -> Option<u64> {
    key.rsplit('-').next()?.parse().ok()
}

/// How recovery picks a checkpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryStrategy {
    /// Use the checkpoint with the highest sequence number
    #[default]
    Latest,
}

/// Result of a recovery attempt. Callers decide whether to resume from
/// the checkpoint or start cold.
#[derive(Debug, Clone)]
pub struct RecoveryOutcome {
    pub success: bool,
    /// The resolved checkpoint on success
    pub checkpoint: Option<Checkpoint>,
    /// Why recovery failed, on failure
    pub reason: Option<String>,
}

impl RecoveryOutcome {
    pub fn recovered(checkpoint: Checkpoint) -> Self {
        Self {
            success: true,
            checkpoint: Some(checkpoint),
            reason: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            checkpoint: None,
            reason: Some(reason.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_format() {
        assert_eq!(checkpoint_key("engine-1", 42), "engine-1-checkpoint-42");
    }

    #[test]
    fn test_parse_sequence() {
        assert_eq!(parse_sequence("engine-1-checkpoint-42"), Some(42));
        assert_eq!(parse_sequence("engine-1-checkpoint-0"), Some(0));
        assert_eq!(parse_sequence("garbage"), None);
    }

    #[test]
    fn test_outcome_constructors() {
        let failed = RecoveryOutcome::failed("no checkpoint found for instance 'x'");
        assert!(!failed.success);
        assert!(failed.checkpoint.is_none());
        assert!(failed.reason.unwrap().contains("no checkpoint found"));
    }
}
