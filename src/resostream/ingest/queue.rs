//! Bounded work queue with overflow policies
//!
//! A capacity-bounded FIFO that decouples producers from the worker
//! pool. When the queue is full the configured policy decides what
//! gives: the oldest item, the newest item, or the producer's time.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// Flow-control response when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverflowPolicy {
    /// Evict items from the head until the new item fits
    DropOldest,
    /// Reject the new item
    DropNewest,
    /// Suspend the producer until space frees up
    Block,
    /// Try a normal enqueue, falling back to a single head eviction
    ExpandBestEffort,
}

/// Outcome of one push.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Item enqueued without displacing anything
    Accepted,
    /// Item enqueued after evicting this many older items
    AcceptedAfterEvicting(usize),
    /// Item not enqueued
    Rejected,
}

impl Admission {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, Admission::Rejected)
    }
}

/// Bounded FIFO work queue shared by producers and workers.
///
/// Closing the queue wakes every waiter; blocked producers fail their
/// submission cleanly and workers drain the remaining items before
/// observing the end of the stream.
pub struct OverflowQueue<T> {
    items: Mutex<VecDeque<T>>,
    capacity: usize,
    policy: OverflowPolicy,
    item_ready: Notify,
    space_ready: Notify,
    closed: AtomicBool,
}

impl<T> OverflowQueue<T> {
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        let capacity = capacity.max(1);
        Self {
            items: Mutex::new(VecDeque::with_capacity(capacity.min(1024))),
            capacity,
            policy,
            item_ready: Notify::new(),
            space_ready: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Admit an item under the overflow policy.
    ///
    /// Only the `Block` policy suspends; the others return immediately.
    /// A closed queue rejects everything, including producers already
    /// waiting for space.
    pub async fn push(&self, item: T) -> Admission {
        if self.is_closed() {
            return Admission::Rejected;
        }

        match self.policy {
            OverflowPolicy::DropOldest => {
                let mut items = self.items.lock().unwrap();
                let mut evicted = 0;
                while items.len() >= self.capacity {
                    items.pop_front();
                    evicted += 1;
                }
                items.push_back(item);
                drop(items);
                self.item_ready.notify_one();
                if evicted == 0 {
                    Admission::Accepted
                } else {
                    Admission::AcceptedAfterEvicting(evicted)
                }
            }
            OverflowPolicy::DropNewest => {
                let mut items = self.items.lock().unwrap();
                if items.len() >= self.capacity {
                    return Admission::Rejected;
                }
                items.push_back(item);
                drop(items);
                self.item_ready.notify_one();
                Admission::Accepted
            }
            OverflowPolicy::ExpandBestEffort => {
                let mut items = self.items.lock().unwrap();
                let evicted = if items.len() >= self.capacity {
                    items.pop_front();
                    1
                } else {
                    0
                };
                items.push_back(item);
                drop(items);
                self.item_ready.notify_one();
                if evicted == 0 {
                    Admission::Accepted
                } else {
                    Admission::AcceptedAfterEvicting(evicted)
                }
            }
            OverflowPolicy::Block => {
                loop {
                    {
                        let mut items = self.items.lock().unwrap();
                        if self.is_closed() {
                            return Admission::Rejected;
                        }
                        if items.len() < self.capacity {
                            items.push_back(item);
                            drop(items);
                            self.item_ready.notify_one();
                            return Admission::Accepted;
                        }
                    }
                    self.space_ready.notified().await;
                }
            }
        }
    }

    /// Take the next item, waiting while the queue is empty. Returns
    /// `None` once the queue is closed and drained.
    pub async fn pop(&self) -> Option<T> {
        loop {
            {
                let mut items = self.items.lock().unwrap();
                if let Some(item) = items.pop_front() {
                    drop(items);
                    self.space_ready.notify_one();
                    return Some(item);
                }
                if self.is_closed() {
                    return None;
                }
            }
            self.item_ready.notified().await;
        }
    }

    /// Close the queue: producers are rejected from now on, workers
    /// drain whatever is left.
    pub fn close(&self) {
        self.closed.store(true, Ordering::Relaxed);
        self.item_ready.notify_waiters();
        self.space_ready.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.items.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
