//! Event dispatcher
//!
//! Pairs published events with the subscriptions matching at publish
//! time and delivers them from a bounded queue through a worker pool.
//!
//! ## Delivery Semantics
//!
//! - At-least-once: a delivery whose handlers all succeed completes;
//!   if any handler fails the whole delivery is re-enqueued with its
//!   schedule pushed back by `base_delay * attempt`, up to the retry
//!   budget, then dropped as a final failure.
//! - Per-subscription isolation: one failing handler never affects
//!   delivery to the other subscriptions or the worker loop.
//! - Ordering: FIFO by default; with priority ordering enabled the
//!   queue becomes a heap ordered by descending event priority, ties
//!   broken by earliest schedule time.
//! - Publish backpressure: when the delivery queue is full the event is
//!   dropped, counted, and `publish` returns false.

use crate::resostream::config::EngineConfig;
use crate::resostream::dispatch::subscription::{
    ErrorHandler, EventFilter, EventHandler, Subscription,
};
use crate::resostream::event::StreamEvent;
use chrono::Utc;
use log::{debug, error, trace, warn};
use serde::Serialize;
use std::cmp::Ordering as CmpOrdering;
use std::collections::{BinaryHeap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use uuid::Uuid;

/// One event paired with its target subscriptions, queued for delivery.
struct EventDelivery {
    event: StreamEvent,
    targets: Vec<Arc<Subscription>>,
    /// Attempt number this delivery is on, starting at 1
    attempt: u32,
    /// Earliest wall-clock time (ms) this delivery may run
    scheduled_at: i64,
}

/// Heap adapter: highest priority first, earliest schedule on ties.
struct OrderedDelivery(EventDelivery);

impl PartialEq for OrderedDelivery {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == CmpOrdering::Equal
    }
}

impl Eq for OrderedDelivery {}

impl PartialOrd for OrderedDelivery {
    fn partial_cmp(&self, other: &Self) -> Option<CmpOrdering> {
        Some(self.cmp(other))
    }
}

impl Ord for OrderedDelivery {
    fn cmp(&self, other: &Self) -> CmpOrdering {
        self.0
            .event
            .priority
            .cmp(&other.0.event.priority)
            .then_with(|| other.0.scheduled_at.cmp(&self.0.scheduled_at))
    }
}

enum QueueInner {
    Fifo(VecDeque<EventDelivery>),
    Priority(BinaryHeap<OrderedDelivery>),
}

/// Bounded delivery queue, FIFO or priority-ordered.
///
/// Publishes respect the capacity; retries bypass it so a full queue
/// never discards a delivery that already consumed attempts.
struct DeliveryQueue {
    inner: Mutex<QueueInner>,
    notify: Notify,
    capacity: usize,
}

impl DeliveryQueue {
    fn new(capacity: usize, ordered: bool) -> Self {
        let inner = if ordered {
            QueueInner::Priority(BinaryHeap::new())
        } else {
            QueueInner::Fifo(VecDeque::new())
        };
        Self {
            inner: Mutex::new(inner),
            notify: Notify::new(),
            capacity,
        }
    }

    fn len(&self) -> usize {
        match &*self.inner.lock().unwrap() {
            QueueInner::Fifo(queue) => queue.len(),
            QueueInner::Priority(heap) => heap.len(),
        }
    }

    fn try_publish(&self, delivery: EventDelivery) -> bool {
        {
            let mut inner = self.inner.lock().unwrap();
            let full = match &*inner {
                QueueInner::Fifo(queue) => queue.len() >= self.capacity,
                QueueInner::Priority(heap) => heap.len() >= self.capacity,
            };
            if full {
                return false;
            }
            match &mut *inner {
                QueueInner::Fifo(queue) => queue.push_back(delivery),
                QueueInner::Priority(heap) => heap.push(OrderedDelivery(delivery)),
            }
        }
        self.notify.notify_one();
        true
    }

    fn push_retry(&self, delivery: EventDelivery) {
        {
            let mut inner = self.inner.lock().unwrap();
            match &mut *inner {
                QueueInner::Fifo(queue) => queue.push_back(delivery),
                QueueInner::Priority(heap) => heap.push(OrderedDelivery(delivery)),
            }
        }
        self.notify.notify_one();
    }

    fn try_pop(&self) -> Option<EventDelivery> {
        let mut inner = self.inner.lock().unwrap();
        match &mut *inner {
            QueueInner::Fifo(queue) => queue.pop_front(),
            QueueInner::Priority(heap) => heap.pop().map(|ordered| ordered.0),
        }
    }

    async fn pop(&self) -> EventDelivery {
        loop {
            if let Some(delivery) = self.try_pop() {
                return delivery;
            }
            self.notify.notified().await;
        }
    }
}

/// Point-in-time dispatcher counters.
#[derive(Debug, Clone, Serialize)]
pub struct DispatcherStats {
    pub published: u64,
    pub publish_dropped: u64,
    pub deliveries_completed: u64,
    pub handler_failures: u64,
    pub retries: u64,
    pub final_failures: u64,
    pub active_subscriptions: usize,
    pub queued_deliveries: usize,
}

/// Typed publish/subscribe dispatcher with bounded retry.
pub struct EventDispatcher {
    subscriptions: RwLock<HashMap<Uuid, Arc<Subscription>>>,
    queue: DeliveryQueue,
    max_retry_attempts: u32,
    retry_base_delay_ms: i64,
    worker_count: usize,

    published: AtomicU64,
    publish_dropped: AtomicU64,
    deliveries_completed: AtomicU64,
    handler_failures: AtomicU64,
    retries: AtomicU64,
    final_failures: AtomicU64,
}

impl EventDispatcher {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            queue: DeliveryQueue::new(config.dispatch_queue_size, config.priority_ordering),
            max_retry_attempts: config.max_retry_attempts,
            retry_base_delay_ms: config.retry_base_delay.as_millis() as i64,
            worker_count: config.dispatch_workers,
            published: AtomicU64::new(0),
            publish_dropped: AtomicU64::new(0),
            deliveries_completed: AtomicU64::new(0),
            handler_failures: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            final_failures: AtomicU64::new(0),
        }
    }

    /// Register interest in a kind of event (and all its sub-kinds).
    pub fn subscribe(&self, selector: impl Into<String>, handler: EventHandler) -> Arc<Subscription> {
        self.subscribe_filtered(selector, handler, None, None)
    }

    /// Register interest with an optional filter and error handler.
    pub fn subscribe_filtered(
        &self,
        selector: impl Into<String>,
        handler: EventHandler,
        filter: Option<EventFilter>,
        error_handler: Option<ErrorHandler>,
    ) -> Arc<Subscription> {
        let subscription = Arc::new(Subscription::new(
            selector.into(),
            handler,
            filter,
            error_handler,
        ));
        self.subscriptions
            .write()
            .unwrap()
            .insert(subscription.id(), Arc::clone(&subscription));
        debug!(
            "Subscribed {} to '{}'",
            subscription.id(),
            subscription.selector()
        );
        subscription
    }

    /// Soft-delete a subscription. In-flight deliveries that captured
    /// it see the inactive flag and skip it.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        subscription.deactivate();
        debug!("Unsubscribed {}", subscription.id());
    }

    /// Publish an event to every matching, active subscription.
    ///
    /// Returns false when the delivery queue is full and the event was
    /// dropped.
    pub fn publish(&self, event: StreamEvent) -> bool {
        self.published.fetch_add(1, Ordering::Relaxed);

        let targets: Vec<Arc<Subscription>> = self
            .subscriptions
            .read()
            .unwrap()
            .values()
            .filter(|sub| sub.is_active() && event.kind.matches(sub.selector()))
            .cloned()
            .collect();

        if targets.is_empty() {
            trace!("No subscribers for event kind '{}'", event.kind.tag);
            return true;
        }

        let delivery = EventDelivery {
            event,
            targets,
            attempt: 1,
            scheduled_at: Utc::now().timestamp_millis(),
        };
        if self.queue.try_publish(delivery) {
            true
        } else {
            self.publish_dropped.fetch_add(1, Ordering::Relaxed);
            warn!("Delivery queue full, dropping published event");
            false
        }
    }

    /// Deliver to every target, then complete, retry or finally fail.
    fn process_delivery(&self, mut delivery: EventDelivery) {
        let mut failed = 0u32;
        for subscription in &delivery.targets {
            if !subscription.wants(&delivery.event) {
                continue;
            }
            if let Err(err) = subscription.deliver(&delivery.event) {
                self.handler_failures.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "Handler failure on attempt {}: {}",
                    delivery.attempt, err
                );
                failed += 1;
            }
        }

        if failed == 0 {
            self.deliveries_completed.fetch_add(1, Ordering::Relaxed);
            return;
        }

        if delivery.attempt < self.max_retry_attempts {
            let backoff_ms = self.retry_base_delay_ms * delivery.attempt as i64;
            delivery.scheduled_at = Utc::now().timestamp_millis() + backoff_ms;
            delivery.attempt += 1;
            self.retries.fetch_add(1, Ordering::Relaxed);
            trace!(
                "Re-enqueueing event {} for attempt {} in {}ms",
                delivery.event.id,
                delivery.attempt,
                backoff_ms
            );
            self.queue.push_retry(delivery);
        } else {
            self.final_failures.fetch_add(1, Ordering::Relaxed);
            error!(
                "Dropping event {} after {} attempts ({} handler failures on last attempt)",
                delivery.event.id, delivery.attempt, failed
            );
        }
    }

    /// Spawn the delivery workers. Each stops when the shutdown channel
    /// fires.
    pub fn start(self: &Arc<Self>, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for worker_id in 0..self.worker_count {
            let dispatcher = Arc::clone(self);
            let mut shutdown_rx = shutdown.subscribe();
            handles.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        delivery = dispatcher.queue.pop() => {
                            // Honor the retry schedule before running
                            let now = Utc::now().timestamp_millis();
                            if delivery.scheduled_at > now {
                                let wait = (delivery.scheduled_at - now) as u64;
                                tokio::time::sleep(Duration::from_millis(wait)).await;
                            }
                            dispatcher.process_delivery(delivery);
                        }
                        _ = shutdown_rx.recv() => {
                            debug!("Dispatch worker {} stopping", worker_id);
                            break;
                        }
                    }
                }
            }));
        }
        handles
    }

    /// Deliveries still waiting in the queue.
    pub fn queued_deliveries(&self) -> usize {
        self.queue.len()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> DispatcherStats {
        let active_subscriptions = self
            .subscriptions
            .read()
            .unwrap()
            .values()
            .filter(|sub| sub.is_active())
            .count();
        DispatcherStats {
            published: self.published.load(Ordering::Relaxed),
            publish_dropped: self.publish_dropped.load(Ordering::Relaxed),
            deliveries_completed: self.deliveries_completed.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            final_failures: self.final_failures.load(Ordering::Relaxed),
            active_subscriptions,
            queued_deliveries: self.queue.len(),
        }
    }
}
