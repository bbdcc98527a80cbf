//! Stream engine
//!
//! Composition root wiring the four subsystems together: ingestion
//! results publish into the dispatcher, window triggers publish as
//! events, and every component contributes its state to checkpoints.
//!
//! ## Shutdown Order
//!
//! 1. Stop admitting new submissions
//! 2. Drain queued work within the grace period
//! 3. Fire remaining windows and publish their triggers
//! 4. Take one final checkpoint
//! 5. Stop background tasks, force-cancelling stragglers

use crate::resostream::checkpoint::{
    CheckpointBackend, CheckpointCoordinator, RecoveryOutcome, RecoveryStrategy, StateSource,
};
use crate::resostream::config::EngineConfig;
use crate::resostream::dispatch::EventDispatcher;
use crate::resostream::error::StreamResult;
use crate::resostream::event::StreamEvent;
use crate::resostream::ingest::{IngestionGate, WorkProcessor};
use crate::resostream::window::{WindowManager, WindowSpec, WindowTrigger};
use log::{error, info, warn};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

impl StateSource for WindowManager {
    fn name(&self) -> &str {
        "window_manager"
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(self.stats()).unwrap_or(Value::Null)
    }
}

impl StateSource for EventDispatcher {
    fn name(&self) -> &str {
        "event_dispatcher"
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(self.stats()).unwrap_or(Value::Null)
    }
}

impl StateSource for IngestionGate {
    fn name(&self) -> &str {
        "ingestion_gate"
    }

    fn snapshot(&self) -> Value {
        serde_json::to_value(self.stats()).unwrap_or(Value::Null)
    }
}

/// Outcome of a graceful shutdown attempt.
#[derive(Debug, Clone)]
pub struct ShutdownSummary {
    /// Whether queued work drained within the grace period
    pub drained: bool,
    /// Windows fired by the shutdown drain
    pub windows_fired: usize,
    /// Sequence of the final checkpoint, when it saved
    pub final_checkpoint: Option<u64>,
    /// Background tasks that had to be force-cancelled
    pub tasks_force_cancelled: usize,
    /// Total shutdown time
    pub elapsed: Duration,
}

impl ShutdownSummary {
    /// True when nothing had to be forced or abandoned.
    pub fn all_graceful(&self) -> bool {
        self.drained && self.tasks_force_cancelled == 0
    }
}

impl fmt::Display for ShutdownSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.all_graceful() {
            write!(
                f,
                "Graceful shutdown complete: {} windows fired in {:?}",
                self.windows_fired, self.elapsed
            )
        } else {
            write!(
                f,
                "Shutdown complete: drained={}, {} tasks force-cancelled in {:?}",
                self.drained, self.tasks_force_cancelled, self.elapsed
            )
        }
    }
}

/// The assembled streaming core.
pub struct StreamEngine {
    config: EngineConfig,
    windows: Arc<WindowManager>,
    dispatcher: Arc<EventDispatcher>,
    gate: Arc<IngestionGate>,
    checkpoints: Arc<CheckpointCoordinator>,
    shutdown: broadcast::Sender<()>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    running: AtomicBool,
}

impl StreamEngine {
    /// Build an engine from a validated configuration, a checkpoint
    /// backend, and the ingestion processing function.
    pub fn new(
        config: EngineConfig,
        backend: Arc<dyn CheckpointBackend>,
        processor: WorkProcessor,
    ) -> StreamResult<Self> {
        config.validate()?;

        let windows = Arc::new(WindowManager::new(&config));
        let dispatcher = Arc::new(EventDispatcher::new(&config));
        let gate = Arc::new(IngestionGate::new(&config, processor));
        let checkpoints = Arc::new(CheckpointCoordinator::new(&config, backend));

        // Ingestion results publish into the dispatcher
        let publish_target = Arc::clone(&dispatcher);
        gate.set_result_handler(Arc::new(move |event| {
            publish_target.publish(event);
        }));

        // Background-fired window triggers publish as events
        let publish_target = Arc::clone(&dispatcher);
        windows.set_trigger_handler(Arc::new(move |trigger| {
            publish_target.publish(trigger.into_event());
        }));

        checkpoints.register_source(Arc::clone(&windows) as Arc<dyn StateSource>);
        checkpoints.register_source(Arc::clone(&dispatcher) as Arc<dyn StateSource>);
        checkpoints.register_source(Arc::clone(&gate) as Arc<dyn StateSource>);

        let (shutdown, _) = broadcast::channel(4);

        Ok(Self {
            config,
            windows,
            dispatcher,
            gate,
            checkpoints,
            shutdown,
            tasks: Mutex::new(Vec::new()),
            running: AtomicBool::new(false),
        })
    }

    /// Start the worker pools and background tasks. Idempotent.
    pub fn start(&self) {
        if self.running.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(
            "Starting stream engine '{}' ({} ingest workers, {} dispatch workers)",
            self.config.instance_id, self.config.ingest_workers, self.config.dispatch_workers
        );

        let mut tasks = self.tasks.lock().unwrap();
        tasks.extend(self.windows.start(&self.shutdown));
        tasks.extend(self.dispatcher.start(&self.shutdown));
        tasks.extend(self.gate.start(&self.shutdown));
        tasks.push(self.checkpoints.start(&self.shutdown));
    }

    /// Submit a raw payload through the ingestion gate.
    pub async fn submit(&self, payload: Value, priority: i32) -> bool {
        self.gate.submit(payload, priority).await
    }

    /// Publish an event directly to the dispatcher.
    pub fn publish(&self, event: StreamEvent) -> bool {
        self.dispatcher.publish(event)
    }

    /// Route an event into the windowing engine. Inline triggers (count
    /// and session windows) are published and also returned.
    pub fn add_event(&self, spec: &WindowSpec, event: StreamEvent) -> Vec<WindowTrigger> {
        let triggers = self.windows.add_event(spec, event);
        for trigger in &triggers {
            self.dispatcher.publish(trigger.clone().into_event());
        }
        triggers
    }

    /// Resolve the checkpoint to resume from and continue its sequence
    /// numbering on success.
    pub async fn recover_from_failure(&self, strategy: RecoveryStrategy) -> RecoveryOutcome {
        let outcome = self.checkpoints.recover(strategy).await;
        if let Some(checkpoint) = &outcome.checkpoint {
            self.checkpoints.resume_from(checkpoint);
        }
        outcome
    }

    /// Take a checkpoint immediately.
    pub async fn checkpoint_now(&self) -> StreamResult<u64> {
        self.checkpoints
            .checkpoint_now()
            .await
            .map(|checkpoint| checkpoint.sequence)
    }

    pub fn windows(&self) -> &Arc<WindowManager> {
        &self.windows
    }

    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.dispatcher
    }

    pub fn gate(&self) -> &Arc<IngestionGate> {
        &self.gate
    }

    pub fn checkpoints(&self) -> &Arc<CheckpointCoordinator> {
        &self.checkpoints
    }

    /// Gracefully shut the engine down: stop intake, drain, fire
    /// remaining windows, checkpoint, then stop background tasks.
    pub async fn shutdown(&self) -> ShutdownSummary {
        let started = Instant::now();
        if !self.running.swap(false, Ordering::SeqCst) {
            return ShutdownSummary {
                drained: true,
                windows_fired: 0,
                final_checkpoint: None,
                tasks_force_cancelled: 0,
                elapsed: started.elapsed(),
            };
        }
        info!("Shutting down stream engine '{}'", self.config.instance_id);

        self.gate.stop_accepting();
        let drained = self.gate.drain(self.config.shutdown_grace).await;

        let fired = self.windows.drain();
        let windows_fired = fired.len();
        for trigger in fired {
            self.dispatcher.publish(trigger.into_event());
        }

        // Let queued deliveries reach the workers before tasks stop
        let deadline = Instant::now() + self.config.shutdown_grace;
        while self.dispatcher.queued_deliveries() > 0 && Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let final_checkpoint = match self.checkpoints.checkpoint_now().await {
            Ok(checkpoint) => Some(checkpoint.sequence),
            Err(e) => {
                error!("Final checkpoint failed: {}", e);
                None
            }
        };

        self.gate.close();
        let _ = self.shutdown.send(());

        let handles: Vec<JoinHandle<()>> = self.tasks.lock().unwrap().drain(..).collect();
        let mut tasks_force_cancelled = 0;
        for mut handle in handles {
            if tokio::time::timeout(Duration::from_millis(250), &mut handle)
                .await
                .is_err()
            {
                handle.abort();
                tasks_force_cancelled += 1;
            }
        }
        if tasks_force_cancelled > 0 {
            warn!("Force-cancelled {} background tasks", tasks_force_cancelled);
        }

        let summary = ShutdownSummary {
            drained,
            windows_fired,
            final_checkpoint,
            tasks_force_cancelled,
            elapsed: started.elapsed(),
        };
        info!("{}", summary);
        summary
    }
}
