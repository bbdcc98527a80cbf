//! # resostream
//!
//! A streaming event-processing core for adaptive pattern-recognition
//! pipelines, built on `tokio` for efficient, non-blocking processing.
//!
//! ## Features
//!
//! - **Windowing Engine**: Tumbling/sliding time windows, count windows,
//!   session windows and global windows with watermark-based late firing
//! - **Event Dispatch**: Typed publish/subscribe with per-subscription
//!   failure isolation and bounded retry with backoff
//! - **Backpressure-Aware Ingestion**: A bounded work queue with
//!   configurable overflow policies feeding a fixed worker pool
//! - **Checkpoint/Recovery**: Periodic sequence-numbered state snapshots
//!   through a pluggable persistence backend
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use resostream::{EngineConfig, StreamEvent, WindowSpec};
//! use resostream::dispatch::EventDispatcher;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::default();
//!     let dispatcher = Arc::new(EventDispatcher::new(&config));
//!
//!     let sub = dispatcher.subscribe("window.trigger", Arc::new(|event: &StreamEvent| {
//!         println!("window fired: {:?}", event.payload);
//!         Ok(())
//!     }));
//!
//!     let spec = WindowSpec::tumbling_time(
//!         "activity",
//!         Duration::from_secs(5),
//!         Arc::new(|event: &StreamEvent| {
//!             event.metadata.get("source").cloned().unwrap_or_default()
//!         }),
//!     )?;
//!
//!     let _ = (sub, spec);
//!     Ok(())
//! }
//! ```

#![allow(clippy::derivable_impls)]
#![allow(clippy::collapsible_if)]
#![allow(clippy::needless_doctest_main)]
#![allow(clippy::large_enum_variant)]

pub mod resostream;

// Re-export the core surface at the crate root
pub use crate::resostream::checkpoint::{
    Checkpoint, CheckpointBackend, CheckpointCoordinator, FileSystemBackend, InMemoryBackend,
    RecoveryOutcome, RecoveryStrategy, StateSource,
};
pub use crate::resostream::config::EngineConfig;
pub use crate::resostream::dispatch::{EventDispatcher, Subscription};
pub use crate::resostream::engine::StreamEngine;
pub use crate::resostream::error::{StreamError, StreamResult};
pub use crate::resostream::event::{EventKind, StreamEvent};
pub use crate::resostream::ingest::{IngestionGate, OverflowPolicy, WorkItem};
pub use crate::resostream::window::{WindowKind, WindowManager, WindowSpec, WindowTrigger};

pub use crate::resostream::{checkpoint, config, dispatch, engine, error, event, ingest, window};
