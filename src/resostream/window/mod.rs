//! Windowing engine
//!
//! Assigns keyed events to live windows, decides when a window fires,
//! and reclaims expired windows. Six window kinds are supported:
//! tumbling and sliding time windows, tumbling and sliding count
//! windows, session windows, and global windows.
//!
//! Time windows fire through the watermark: a background task advances
//! `watermark = now - allowed_lateness` on a short tick and fires every
//! un-triggered bounded window whose end has passed it. Count windows
//! fire inline when their size is reached. Session windows fire when a
//! gap splits them or when the watermark passes their quiet period.
//! Global windows fire only on explicit request or at shutdown drain.

pub mod manager;
pub mod spec;
pub mod state;

pub use manager::{WindowManager, WindowManagerStats};
pub use spec::{KeyExtractor, WindowKind, WindowSpec};
pub use state::{Window, WindowTrigger};
