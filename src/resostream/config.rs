//! Engine configuration
//!
//! Every tunable of the streaming core lives here, with defaults that
//! hold up under moderate load. Override individual knobs through the
//! fluent `with_*` methods.

use crate::resostream::error::{StreamError, StreamResult};
use crate::resostream::ingest::OverflowPolicy;
use std::time::Duration;

/// Configuration for the streaming core.
///
/// # Example
///
/// ```rust
/// use resostream::EngineConfig;
/// use std::time::Duration;
///
/// let config = EngineConfig::default()
///     .with_ingest_queue_size(50_000)
///     .with_priority_ordering(true)
///     .with_allowed_lateness(Duration::from_secs(30));
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Identifier for this engine instance, used in checkpoint keys
    pub instance_id: String,

    /// Capacity of the ingestion work queue
    pub ingest_queue_size: usize,

    /// Capacity of the event delivery queue
    pub dispatch_queue_size: usize,

    /// Number of ingestion workers pulling from the work queue
    pub ingest_workers: usize,

    /// Number of dispatch workers delivering events
    pub dispatch_workers: usize,

    /// Maximum delivery attempts per event before final failure
    pub max_retry_attempts: u32,

    /// Base delay for retry backoff; attempt N waits `base * N`
    pub retry_base_delay: Duration,

    /// Deadline for a single unit of ingestion work
    pub processing_timeout: Duration,

    /// Interval between periodic checkpoints
    pub checkpoint_interval: Duration,

    /// Number of checkpoints retained per instance
    pub max_checkpoints: usize,

    /// How far behind wall clock the watermark trails
    pub allowed_lateness: Duration,

    /// Tick interval of the watermark advance task
    pub watermark_tick: Duration,

    /// Tick interval of the window cleanup task
    pub cleanup_tick: Duration,

    /// Idle period after which a triggered window is reclaimed
    pub window_idle_expiry: Duration,

    /// Deliver higher-priority events first instead of FIFO
    pub priority_ordering: bool,

    /// Flow-control policy applied when the ingestion queue is full
    pub overflow_policy: OverflowPolicy,

    /// Grace period for draining in-flight work at shutdown
    pub shutdown_grace: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            instance_id: "resostream".to_string(),
            ingest_queue_size: 10_000,
            dispatch_queue_size: 1_000,
            ingest_workers: 4,
            dispatch_workers: 4,
            max_retry_attempts: 3,
            retry_base_delay: Duration::from_millis(100),
            processing_timeout: Duration::from_secs(5),
            checkpoint_interval: Duration::from_secs(300),
            max_checkpoints: 10,
            allowed_lateness: Duration::from_secs(10),
            watermark_tick: Duration::from_millis(50),
            cleanup_tick: Duration::from_secs(30),
            window_idle_expiry: Duration::from_secs(60),
            priority_ordering: false,
            overflow_policy: OverflowPolicy::DropOldest,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Create a configuration with the given instance id and defaults.
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            ..Default::default()
        }
    }

    /// Set the ingestion queue capacity.
    pub fn with_ingest_queue_size(mut self, size: usize) -> Self {
        self.ingest_queue_size = size;
        self
    }

    /// Set the delivery queue capacity.
    pub fn with_dispatch_queue_size(mut self, size: usize) -> Self {
        self.dispatch_queue_size = size;
        self
    }

    /// Set the ingestion worker count.
    pub fn with_ingest_workers(mut self, workers: usize) -> Self {
        self.ingest_workers = workers;
        self
    }

    /// Set the dispatch worker count.
    pub fn with_dispatch_workers(mut self, workers: usize) -> Self {
        self.dispatch_workers = workers;
        self
    }

    /// Set the maximum delivery attempts per event.
    pub fn with_max_retry_attempts(mut self, attempts: u32) -> Self {
        self.max_retry_attempts = attempts;
        self
    }

    /// Set the base retry delay.
    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the per-item processing deadline.
    pub fn with_processing_timeout(mut self, timeout: Duration) -> Self {
        self.processing_timeout = timeout;
        self
    }

    /// Set the periodic checkpoint interval.
    pub fn with_checkpoint_interval(mut self, interval: Duration) -> Self {
        self.checkpoint_interval = interval;
        self
    }

    /// Set the number of retained checkpoints.
    pub fn with_max_checkpoints(mut self, max: usize) -> Self {
        self.max_checkpoints = max;
        self
    }

    /// Set the watermark lateness allowance.
    pub fn with_allowed_lateness(mut self, lateness: Duration) -> Self {
        self.allowed_lateness = lateness;
        self
    }

    /// Set the watermark tick interval.
    pub fn with_watermark_tick(mut self, tick: Duration) -> Self {
        self.watermark_tick = tick;
        self
    }

    /// Set the cleanup tick interval.
    pub fn with_cleanup_tick(mut self, tick: Duration) -> Self {
        self.cleanup_tick = tick;
        self
    }

    /// Set the idle expiry for triggered windows.
    pub fn with_window_idle_expiry(mut self, expiry: Duration) -> Self {
        self.window_idle_expiry = expiry;
        self
    }

    /// Enable or disable priority-ordered delivery.
    pub fn with_priority_ordering(mut self, enabled: bool) -> Self {
        self.priority_ordering = enabled;
        self
    }

    /// Set the ingestion overflow policy.
    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set the shutdown grace period.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Validate the configuration.
    ///
    /// Rejects empty instance ids, zero-capacity queues and zero-sized
    /// worker pools before any component starts.
    pub fn validate(&self) -> StreamResult<()> {
        if self.instance_id.is_empty() {
            return Err(StreamError::configuration("instance_id must not be empty"));
        }
        if self.ingest_queue_size == 0 {
            return Err(StreamError::configuration(
                "ingest_queue_size must be at least 1",
            ));
        }
        if self.dispatch_queue_size == 0 {
            return Err(StreamError::configuration(
                "dispatch_queue_size must be at least 1",
            ));
        }
        if self.ingest_workers == 0 {
            return Err(StreamError::configuration(
                "ingest_workers must be at least 1",
            ));
        }
        if self.dispatch_workers == 0 {
            return Err(StreamError::configuration(
                "dispatch_workers must be at least 1",
            ));
        }
        if self.max_checkpoints == 0 {
            return Err(StreamError::configuration(
                "max_checkpoints must be at least 1",
            ));
        }
        if self.watermark_tick.is_zero() {
            return Err(StreamError::configuration(
                "watermark_tick must be positive",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.ingest_queue_size, 10_000);
        assert_eq!(config.dispatch_queue_size, 1_000);
        assert_eq!(config.ingest_workers, 4);
        assert_eq!(config.dispatch_workers, 4);
        assert_eq!(config.max_retry_attempts, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(100));
        assert_eq!(config.checkpoint_interval, Duration::from_secs(300));
        assert_eq!(config.max_checkpoints, 10);
        assert_eq!(config.allowed_lateness, Duration::from_secs(10));
        assert!(!config.priority_ordering);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfig::new("engine-7")
            .with_ingest_queue_size(100)
            .with_dispatch_workers(2)
            .with_priority_ordering(true)
            .with_overflow_policy(OverflowPolicy::Block);
        assert_eq!(config.instance_id, "engine-7");
        assert_eq!(config.ingest_queue_size, 100);
        assert_eq!(config.dispatch_workers, 2);
        assert!(config.priority_ordering);
        assert_eq!(config.overflow_policy, OverflowPolicy::Block);
    }

    #[test]
    fn test_validation_rejects_zero_sizes() {
        assert!(EngineConfig::default()
            .with_ingest_queue_size(0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_dispatch_workers(0)
            .validate()
            .is_err());
        assert!(EngineConfig::default()
            .with_max_checkpoints(0)
            .validate()
            .is_err());
        assert!(EngineConfig::new("").validate().is_err());
    }
}
