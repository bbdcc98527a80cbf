//! Event model
//!
//! Events are the single currency of the streaming core: ingestion
//! produces them, windows accumulate them, and the dispatcher delivers
//! them to subscriptions. An event is immutable once published, apart
//! from metadata added before publish.
//!
//! ## Kind Matching
//!
//! Every event carries a kind tag plus the ordered list of its "is-a"
//! ancestor tags. A subscription matches an event when its selector
//! equals the event's tag or any ancestor, so subscribing to
//! `"window.trigger"` also receives `"window.trigger.session"` events.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use uuid::Uuid;

/// A kind tag with its "is-a" ancestor tags.
///
/// # Example
///
/// ```rust
/// use resostream::EventKind;
///
/// let kind = EventKind::new("window.trigger.session").is_a("window.trigger");
/// assert!(kind.matches("window.trigger.session"));
/// assert!(kind.matches("window.trigger"));
/// assert!(!kind.matches("ingest.result"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventKind {
    /// The most specific tag for this kind
    pub tag: String,
    /// Ancestor tags, most specific first
    pub ancestors: Vec<String>,
}

impl EventKind {
    /// Create a kind with no ancestors.
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ancestors: Vec::new(),
        }
    }

    /// Add an ancestor tag this kind also answers to.
    pub fn is_a(mut self, ancestor: impl Into<String>) -> Self {
        self.ancestors.push(ancestor.into());
        self
    }

    /// Check whether this kind matches a subscription selector.
    pub fn matches(&self, selector: &str) -> bool {
        self.tag == selector || self.ancestors.iter().any(|a| a == selector)
    }
}

/// A single event flowing through the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamEvent {
    /// Unique event id
    pub id: Uuid,
    /// Kind tag and ancestors, used for subscription matching
    pub kind: EventKind,
    /// Event time in milliseconds since the epoch
    pub timestamp: i64,
    /// Delivery priority; higher delivers first when ordering is enabled
    pub priority: i32,
    /// Opaque payload
    pub payload: Value,
    /// Free-form metadata, mutable until publish
    pub metadata: HashMap<String, String>,
}

impl StreamEvent {
    /// Create an event stamped with the current wall-clock time.
    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            timestamp: Utc::now().timestamp_millis(),
            priority: 0,
            payload,
            metadata: HashMap::new(),
        }
    }

    /// Override the event time (milliseconds since the epoch).
    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Set the delivery priority.
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Attach a metadata entry.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
