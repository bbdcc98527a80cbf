//! Checkpointing and recovery
//!
//! Periodically snapshots the externally-visible state of the other
//! components into an immutable, sequence-numbered checkpoint, persists
//! it through a pluggable backend, and drives recovery on restart.
//! Persistence failures are logged and never block processing or the
//! next scheduled attempt.

pub mod backend;
pub mod coordinator;
pub mod types;

pub use backend::{BackendError, CheckpointBackend, CompressionType, FileSystemBackend, InMemoryBackend};
pub use coordinator::{CheckpointCoordinator, CoordinatorStats, StateSource};
pub use types::{Checkpoint, RecoveryOutcome, RecoveryStrategy};
