pub mod checkpoint;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod ingest;
pub mod window;

// Re-export the types most callers need
pub use checkpoint::{Checkpoint, CheckpointCoordinator, RecoveryOutcome, RecoveryStrategy};
pub use config::EngineConfig;
pub use dispatch::EventDispatcher;
pub use engine::StreamEngine;
pub use error::{StreamError, StreamResult};
pub use event::{EventKind, StreamEvent};
pub use ingest::IngestionGate;
pub use window::{WindowManager, WindowSpec};
