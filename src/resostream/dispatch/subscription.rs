//! Subscriptions
//!
//! A subscription pairs a kind selector with a handler and optional
//! filter and error handler. Unsubscribing soft-deletes: the `active`
//! flag flips and delivery skips the subscription, but the record stays
//! alive because in-flight deliveries may still reference it.

use crate::resostream::error::{StreamError, StreamResult};
use crate::resostream::event::StreamEvent;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Handles one delivered event. An `Err` counts as a delivery failure
/// for this subscription and is routed to its error handler.
pub type EventHandler = Arc<dyn Fn(&StreamEvent) -> StreamResult<()> + Send + Sync>;

/// Narrows a subscription beyond kind matching.
pub type EventFilter = Arc<dyn Fn(&StreamEvent) -> bool + Send + Sync>;

/// Receives handler failures for one subscription.
pub type ErrorHandler = Arc<dyn Fn(&StreamEvent, &StreamError) + Send + Sync>;

/// One registered interest in a kind of event.
pub struct Subscription {
    id: Uuid,
    selector: String,
    handler: EventHandler,
    filter: Option<EventFilter>,
    error_handler: Option<ErrorHandler>,
    active: AtomicBool,
}

impl Subscription {
    pub(crate) fn new(
        selector: String,
        handler: EventHandler,
        filter: Option<EventFilter>,
        error_handler: Option<ErrorHandler>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            selector,
            handler,
            filter,
            error_handler,
            active: AtomicBool::new(true),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Kind selector this subscription was registered with.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Relaxed)
    }

    pub(crate) fn deactivate(&self) {
        self.active.store(false, Ordering::Relaxed);
    }

    /// Whether this subscription takes the event right now: still
    /// active, kind matches, filter passes.
    pub(crate) fn wants(&self, event: &StreamEvent) -> bool {
        if !self.is_active() {
            return false;
        }
        if !event.kind.matches(&self.selector) {
            return false;
        }
        match &self.filter {
            Some(filter) => filter(event),
            None => true,
        }
    }

    /// Run the handler inside this subscription's failure boundary.
    ///
    /// A handler failure is routed to the error handler (when present)
    /// and returned; it never propagates further.
    pub(crate) fn deliver(&self, event: &StreamEvent) -> StreamResult<()> {
        match (self.handler)(event) {
            Ok(()) => Ok(()),
            Err(err) => {
                if let Some(error_handler) = &self.error_handler {
                    error_handler(event, &err);
                }
                Err(StreamError::Handler {
                    message: err.to_string(),
                    subscription_id: Some(self.id.to_string()),
                })
            }
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("selector", &self.selector)
            .field("active", &self.is_active())
            .field("has_filter", &self.filter.is_some())
            .field("has_error_handler", &self.error_handler.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resostream::event::EventKind;
    use serde_json::Value;
    use std::sync::atomic::AtomicU32;

    fn event(kind: EventKind) -> StreamEvent {
        StreamEvent::new(kind, Value::Null)
    }

    #[test]
    fn test_wants_checks_kind_and_filter() {
        let sub = Subscription::new(
            "window.trigger".to_string(),
            Arc::new(|_| Ok(())),
            Some(Arc::new(|event: &StreamEvent| event.priority > 0)),
            None,
        );

        let matching = event(EventKind::new("window.trigger.session").is_a("window.trigger"))
            .with_priority(1);
        assert!(sub.wants(&matching));

        let filtered_out =
            event(EventKind::new("window.trigger.session").is_a("window.trigger"));
        assert!(!sub.wants(&filtered_out));

        let wrong_kind = event(EventKind::new("ingest.result")).with_priority(1);
        assert!(!sub.wants(&wrong_kind));
    }

    #[test]
    fn test_deactivate_is_soft() {
        let sub = Subscription::new("a".to_string(), Arc::new(|_| Ok(())), None, None);
        assert!(sub.is_active());
        sub.deactivate();
        assert!(!sub.is_active());
        assert!(!sub.wants(&event(EventKind::new("a"))));
    }

    #[test]
    fn test_handler_failure_routes_to_error_handler() {
        let error_calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&error_calls);
        let sub = Subscription::new(
            "a".to_string(),
            Arc::new(|_| Err(StreamError::handler("resonance mismatch"))),
            None,
            Some(Arc::new(move |_, _| {
                counter.fetch_add(1, Ordering::Relaxed);
            })),
        );

        let result = sub.deliver(&event(EventKind::new("a")));
        assert!(result.is_err());
        assert_eq!(error_calls.load(Ordering::Relaxed), 1);
    }
}
