//! Event dispatch
//!
//! Typed publish/subscribe with at-least-once delivery. Subscriptions
//! select events by kind tag (an event matches a subscription when the
//! selector is its tag or any "is-a" ancestor). Published events are
//! paired with the matching subscriptions at publish time and queued as
//! deliveries; a worker pool delivers them with per-subscription
//! failure isolation and bounded retry with backoff.

pub mod dispatcher;
pub mod subscription;

pub use dispatcher::{DispatcherStats, EventDispatcher};
pub use subscription::{ErrorHandler, EventFilter, EventHandler, Subscription};
