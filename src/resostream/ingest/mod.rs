//! Backpressure-aware ingestion
//!
//! The front door of the streaming core: producers submit raw payloads
//! into a bounded work queue governed by a configurable overflow
//! policy, and a fixed worker pool pulls items through an async
//! processing function under a per-item timeout. Successful results are
//! forwarded to a result handler (typically `EventDispatcher::publish`);
//! failures and timeouts go to a failure handler and never stop the
//! workers.

pub mod gate;
pub mod queue;

pub use gate::{FailureHandler, GateStats, IngestionGate, ResultHandler, WorkItem, WorkProcessor};
pub use queue::{Admission, OverflowPolicy, OverflowQueue};
