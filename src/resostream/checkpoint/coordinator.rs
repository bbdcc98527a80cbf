//! Checkpoint coordinator
//!
//! Collects state blobs from registered sources on a fixed interval,
//! persists them as sequence-numbered checkpoints, prunes old ones
//! after every successful save, and resolves the checkpoint to resume
//! from on restart.

use crate::resostream::checkpoint::backend::CheckpointBackend;
use crate::resostream::checkpoint::types::{
    checkpoint_key, parse_sequence, Checkpoint, RecoveryOutcome, RecoveryStrategy,
};
use crate::resostream::config::EngineConfig;
use crate::resostream::error::{StreamError, StreamResult};
use chrono::Utc;
use log::{debug, error, info, warn};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// A component that contributes an opaque state blob to checkpoints.
pub trait StateSource: Send + Sync {
    /// Component name used as the blob key.
    fn name(&self) -> &str;

    /// Current externally-visible state.
    fn snapshot(&self) -> Value;
}

/// Point-in-time coordinator counters.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorStats {
    pub sequence: u64,
    pub saves_completed: u64,
    pub save_failures: u64,
    pub checkpoints_pruned: u64,
    pub uptime_ms: u64,
}

/// Drives periodic checkpointing and recovery.
pub struct CheckpointCoordinator {
    instance_id: String,
    backend: Arc<dyn CheckpointBackend>,
    sources: RwLock<Vec<Arc<dyn StateSource>>>,
    sequence: AtomicU64,
    interval: Duration,
    max_checkpoints: usize,
    started_at: Instant,

    saves_completed: AtomicU64,
    save_failures: AtomicU64,
    checkpoints_pruned: AtomicU64,
}

impl CheckpointCoordinator {
    pub fn new(config: &EngineConfig, backend: Arc<dyn CheckpointBackend>) -> Self {
        Self {
            instance_id: config.instance_id.clone(),
            backend,
            sources: RwLock::new(Vec::new()),
            sequence: AtomicU64::new(0),
            interval: config.checkpoint_interval,
            max_checkpoints: config.max_checkpoints,
            started_at: Instant::now(),
            saves_completed: AtomicU64::new(0),
            save_failures: AtomicU64::new(0),
            checkpoints_pruned: AtomicU64::new(0),
        }
    }

    /// Register a component whose state every checkpoint captures.
    pub fn register_source(&self, source: Arc<dyn StateSource>) {
        self.sources.write().unwrap().push(source);
    }

    /// Take and persist one checkpoint right now.
    ///
    /// Bumps the sequence, collects every registered source, saves, and
    /// prunes beyond the retention limit. Failures surface to the
    /// caller; the periodic task logs them and tries again next tick.
    pub async fn checkpoint_now(&self) -> StreamResult<Checkpoint> {
        let sequence = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let mut components = HashMap::new();
        {
            let sources = self.sources.read().unwrap();
            for source in sources.iter() {
                components.insert(source.name().to_string(), source.snapshot());
            }
        }

        let mut metadata = HashMap::new();
        metadata.insert(
            "uptime_ms".to_string(),
            self.started_at.elapsed().as_millis().to_string(),
        );

        let checkpoint = Checkpoint {
            instance_id: self.instance_id.clone(),
            sequence,
            created_at: Utc::now(),
            components,
            metadata,
        };

        let key = checkpoint.key();
        if let Err(e) = self.backend.save(&key, &checkpoint).await {
            self.save_failures.fetch_add(1, Ordering::Relaxed);
            return Err(StreamError::checkpoint(e.to_string(), Some(key)));
        }
        self.saves_completed.fetch_add(1, Ordering::Relaxed);
        debug!("Saved checkpoint {}", key);

        match self
            .backend
            .cleanup(&self.instance_id, self.max_checkpoints)
            .await
        {
            Ok(removed) if removed > 0 => {
                self.checkpoints_pruned
                    .fetch_add(removed as u64, Ordering::Relaxed);
                debug!("Pruned {} old checkpoints", removed);
            }
            Ok(_) => {}
            Err(e) => warn!("Checkpoint retention cleanup failed: {}", e),
        }

        Ok(checkpoint)
    }

    /// Resolve the checkpoint to resume from.
    ///
    /// With `Latest`, lists the instance's checkpoints, loads the one
    /// with the highest sequence, and validates it: the instance id
    /// must match and the timestamp must not be in the future. The
    /// caller decides whether to resume or start cold.
    pub async fn recover(&self, strategy: RecoveryStrategy) -> RecoveryOutcome {
        let RecoveryStrategy::Latest = strategy;

        let keys = match self.backend.list(&self.instance_id).await {
            Ok(keys) => keys,
            Err(e) => return RecoveryOutcome::failed(format!("listing checkpoints failed: {}", e)),
        };

        let latest = keys.iter().filter_map(|key| parse_sequence(key)).max();
        let sequence = match latest {
            Some(sequence) => sequence,
            None => {
                return RecoveryOutcome::failed(format!(
                    "no checkpoint found for instance '{}'",
                    self.instance_id
                ))
            }
        };

        let key = checkpoint_key(&self.instance_id, sequence);
        let checkpoint = match self.backend.load(&key).await {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                return RecoveryOutcome::failed(format!("loading '{}' failed: {}", key, e))
            }
        };

        if checkpoint.instance_id != self.instance_id {
            return RecoveryOutcome::failed(format!(
                "checkpoint '{}' belongs to instance '{}'",
                key, checkpoint.instance_id
            ));
        }
        if checkpoint.created_at > Utc::now() {
            return RecoveryOutcome::failed(format!(
                "checkpoint '{}' has a timestamp in the future",
                key
            ));
        }

        info!(
            "Recovered checkpoint {} (sequence {})",
            key, checkpoint.sequence
        );
        RecoveryOutcome::recovered(checkpoint)
    }

    /// Continue the sequence numbering from a recovered checkpoint, so
    /// new checkpoints never reuse a sequence number.
    pub fn resume_from(&self, checkpoint: &Checkpoint) {
        self.sequence
            .fetch_max(checkpoint.sequence, Ordering::SeqCst);
    }

    /// Spawn the periodic checkpoint task.
    pub fn start(self: &Arc<Self>, shutdown: &broadcast::Sender<()>) -> JoinHandle<()> {
        let coordinator = Arc::clone(self);
        let mut shutdown_rx = shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(coordinator.interval);
            // The first tick completes immediately; skip it so the
            // first checkpoint lands one full interval after start
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = coordinator.checkpoint_now().await {
                            error!("Periodic checkpoint failed: {}", e);
                        }
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Checkpoint task stopping");
                        break;
                    }
                }
            }
        })
    }

    /// Counter snapshot.
    pub fn stats(&self) -> CoordinatorStats {
        CoordinatorStats {
            sequence: self.sequence.load(Ordering::SeqCst),
            saves_completed: self.saves_completed.load(Ordering::Relaxed),
            save_failures: self.save_failures.load(Ordering::Relaxed),
            checkpoints_pruned: self.checkpoints_pruned.load(Ordering::Relaxed),
            uptime_ms: self.started_at.elapsed().as_millis() as u64,
        }
    }
}
