//! Ingestion gate
//!
//! `submit` wraps a payload in a work item and admits it through the
//! overflow queue; a fixed pool of workers pulls items and runs the
//! processing function under a per-item deadline. A failing or timed
//! out item is reported to the failure handler and the worker moves on.

use crate::resostream::config::EngineConfig;
use crate::resostream::error::{StreamError, StreamResult};
use crate::resostream::event::StreamEvent;
use crate::resostream::ingest::queue::{Admission, OverflowQueue};
use chrono::Utc;
use futures::future::BoxFuture;
use log::{debug, warn};
use serde::Serialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// One admitted unit of work.
#[derive(Debug, Clone)]
pub struct WorkItem {
    /// Raw payload as submitted
    pub payload: Value,
    /// Priority carried into the produced event
    pub priority: i32,
    /// Wall-clock admission time (ms)
    pub submitted_at: i64,
}

/// Turns one work item into an event. Runs on an ingestion worker
/// under the per-item timeout.
pub type WorkProcessor =
    Arc<dyn Fn(WorkItem) -> BoxFuture<'static, StreamResult<StreamEvent>> + Send + Sync>;

/// Receives each successfully processed event, typically
/// `EventDispatcher::publish`.
pub type ResultHandler = Arc<dyn Fn(StreamEvent) + Send + Sync>;

/// Receives processing failures and timeouts.
pub type FailureHandler = Arc<dyn Fn(StreamError) + Send + Sync>;

/// Point-in-time gate counters.
#[derive(Debug, Clone, Serialize)]
pub struct GateStats {
    pub submitted: u64,
    pub admitted: u64,
    pub evicted: u64,
    pub rejected: u64,
    pub processed: u64,
    pub failed: u64,
    pub timed_out: u64,
    pub queue_depth: usize,
}

/// Bounded, policy-governed front door for raw data.
pub struct IngestionGate {
    queue: Arc<OverflowQueue<WorkItem>>,
    processor: WorkProcessor,
    on_result: RwLock<Option<ResultHandler>>,
    on_failure: RwLock<Option<FailureHandler>>,
    processing_timeout: Duration,
    worker_count: usize,
    accepting: AtomicBool,

    submitted: AtomicU64,
    admitted: AtomicU64,
    evicted: AtomicU64,
    rejected: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    timed_out: AtomicU64,
}

impl IngestionGate {
    pub fn new(config: &EngineConfig, processor: WorkProcessor) -> Self {
        Self {
            queue: Arc::new(OverflowQueue::new(
                config.ingest_queue_size,
                config.overflow_policy,
            )),
            processor,
            on_result: RwLock::new(None),
            on_failure: RwLock::new(None),
            processing_timeout: config.processing_timeout,
            worker_count: config.ingest_workers,
            accepting: AtomicBool::new(true),
            submitted: AtomicU64::new(0),
            admitted: AtomicU64::new(0),
            evicted: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            processed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            timed_out: AtomicU64::new(0),
        }
    }

    /// Install the handler successful results are forwarded to.
    pub fn set_result_handler(&self, handler: ResultHandler) {
        *self.on_result.write().unwrap() = Some(handler);
    }

    /// Install the handler failures and timeouts are reported to.
    pub fn set_failure_handler(&self, handler: FailureHandler) {
        *self.on_failure.write().unwrap() = Some(handler);
    }

    /// Submit a payload for processing.
    ///
    /// Returns false when the gate has stopped accepting or the
    /// overflow policy rejected the item. Under the `Block` policy this
    /// call suspends until space frees up or the gate shuts down.
    pub async fn submit(&self, payload: Value, priority: i32) -> bool {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        if !self.accepting.load(Ordering::Relaxed) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return false;
        }

        let item = WorkItem {
            payload,
            priority,
            submitted_at: Utc::now().timestamp_millis(),
        };
        match self.queue.push(item).await {
            Admission::Accepted => {
                self.admitted.fetch_add(1, Ordering::Relaxed);
                true
            }
            Admission::AcceptedAfterEvicting(count) => {
                self.admitted.fetch_add(1, Ordering::Relaxed);
                self.evicted.fetch_add(count as u64, Ordering::Relaxed);
                debug!("Admitted work item after evicting {} older items", count);
                true
            }
            Admission::Rejected => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                false
            }
        }
    }

    /// Stop admitting new work. In-flight and queued items still drain.
    pub fn stop_accepting(&self) {
        self.accepting.store(false, Ordering::Relaxed);
    }

    /// Wait until queued work drains, up to the grace period. Returns
    /// true when the queue emptied in time.
    pub async fn drain(&self, grace: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + grace;
        while !self.queue.is_empty() {
            if tokio::time::Instant::now() >= deadline {
                warn!(
                    "Ingestion drain timed out with {} items queued",
                    self.queue.len()
                );
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        true
    }

    /// Close the work queue, failing blocked producers and ending the
    /// worker loops once the queue drains.
    pub fn close(&self) {
        self.stop_accepting();
        self.queue.close();
    }

    /// Spawn the ingestion workers.
    pub fn start(self: &Arc<Self>, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for worker_id in 0..self.worker_count {
            let gate = Arc::clone(self);
            let mut shutdown_rx = shutdown.subscribe();
            handles.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        maybe_item = gate.queue.pop() => {
                            match maybe_item {
                                Some(item) => gate.process_item(item).await,
                                None => {
                                    debug!("Ingestion worker {} drained, stopping", worker_id);
                                    break;
                                }
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            debug!("Ingestion worker {} stopping", worker_id);
                            break;
                        }
                    }
                }
            }));
        }
        handles
    }

    /// Run one item through the processor under the per-item deadline.
    /// Failures are contained here; the worker loop never sees them.
    async fn process_item(&self, item: WorkItem) {
        let work = (self.processor)(item);
        match tokio::time::timeout(self.processing_timeout, work).await {
            Ok(Ok(event)) => {
                self.processed.fetch_add(1, Ordering::Relaxed);
                let handler = self.on_result.read().unwrap().clone();
                if let Some(handler) = handler {
                    handler(event);
                }
            }
            Ok(Err(err)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Work item failed: {}", err);
                self.report_failure(err);
            }
            Err(_) => {
                self.timed_out.fetch_add(1, Ordering::Relaxed);
                let err = StreamError::ProcessingTimeout {
                    timeout_ms: self.processing_timeout.as_millis() as u64,
                };
                warn!("{}", err);
                self.report_failure(err);
            }
        }
    }

    fn report_failure(&self, err: StreamError) {
        let handler = self.on_failure.read().unwrap().clone();
        if let Some(handler) = handler {
            handler(err);
        }
    }

    /// Items waiting in the queue.
    pub fn queue_depth(&self) -> usize {
        self.queue.len()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> GateStats {
        GateStats {
            submitted: self.submitted.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            evicted: self.evicted.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            processed: self.processed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            timed_out: self.timed_out.load(Ordering::Relaxed),
            queue_depth: self.queue.len(),
        }
    }
}
