//! Per-window state
//!
//! A `Window` is one live accumulation of events for a (spec, key)
//! pair. It is owned by the manager's window table and mutated under a
//! per-window lock. `triggered` and `expired` are one-way latches:
//! a window fires at most once, and an expired window accepts nothing.

use crate::resostream::event::{EventKind, StreamEvent};
use crate::resostream::window::spec::WindowKind;
use serde_json::json;

/// One live window.
#[derive(Debug)]
pub struct Window {
    /// Spec this window was created from
    pub spec_id: String,
    /// Partition key
    pub key: String,
    /// Window kind
    pub kind: WindowKind,
    /// Start of the window range (ms), or the generation number for
    /// count windows
    pub start: i64,
    /// Exclusive end of the window range (ms); `None` for count,
    /// session and global windows
    pub end: Option<i64>,
    /// Session inactivity gap (ms); zero for other kinds
    pub(crate) session_gap_ms: i64,
    /// Accumulated events in arrival order
    events: Vec<StreamEvent>,
    /// One-way trigger latch
    triggered: bool,
    /// One-way expiry latch
    expired: bool,
    /// Largest event time appended so far (ms)
    last_event_time: i64,
    /// Wall-clock time of the last append or trigger (ms), for idle
    /// reclamation
    last_activity: i64,
}

impl Window {
    pub(crate) fn new(
        spec_id: String,
        key: String,
        kind: WindowKind,
        start: i64,
        end: Option<i64>,
        session_gap_ms: i64,
        now_ms: i64,
    ) -> Self {
        Self {
            spec_id,
            key,
            kind,
            start,
            end,
            session_gap_ms,
            events: Vec::new(),
            triggered: false,
            expired: false,
            last_event_time: i64::MIN,
            last_activity: now_ms,
        }
    }

    /// Whether the window still accepts an event at `event_time`.
    ///
    /// Expired windows accept nothing; bounded windows also reject
    /// events at or past their end.
    pub fn accepts(&self, event_time: i64) -> bool {
        if self.expired {
            return false;
        }
        match self.end {
            Some(end) => event_time < end,
            None => true,
        }
    }

    pub(crate) fn append(&mut self, event: StreamEvent, now_ms: i64) {
        self.last_event_time = self.last_event_time.max(event.timestamp);
        self.last_activity = now_ms;
        self.events.push(event);
    }

    /// Number of accumulated events.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered
    }

    pub fn is_expired(&self) -> bool {
        self.expired
    }

    /// Largest event time appended, or `None` before the first event.
    pub fn last_event_time(&self) -> Option<i64> {
        if self.last_event_time == i64::MIN {
            None
        } else {
            Some(self.last_event_time)
        }
    }

    pub(crate) fn last_activity(&self) -> i64 {
        self.last_activity
    }

    /// Fire the trigger latch. Returns false when the window already
    /// fired.
    pub(crate) fn mark_triggered(&mut self, now_ms: i64) -> bool {
        if self.triggered {
            return false;
        }
        self.triggered = true;
        self.last_activity = now_ms;
        true
    }

    pub(crate) fn mark_expired(&mut self) {
        self.expired = true;
    }

    /// The bound the watermark is compared against: the window end for
    /// time windows, the end of the quiet period for sessions.
    pub(crate) fn watermark_bound(&self) -> Option<i64> {
        match self.kind {
            WindowKind::TumblingTime | WindowKind::SlidingTime => self.end,
            WindowKind::Session => self.last_event_time().map(|t| t + self.session_gap_ms),
            _ => None,
        }
    }

    pub(crate) fn to_trigger(&self) -> WindowTrigger {
        WindowTrigger {
            spec_id: self.spec_id.clone(),
            key: self.key.clone(),
            kind: self.kind,
            start: self.start,
            end: self.end,
            events: self.events.clone(),
        }
    }

    /// Split off the seed events a replacement sliding-count window
    /// keeps: the newest `size - slide` events.
    pub(crate) fn overlap_seed(&self, count_size: usize, count_slide: usize) -> Vec<StreamEvent> {
        let keep = count_size.saturating_sub(count_slide);
        let skip = self.events.len().saturating_sub(keep);
        self.events[skip..].to_vec()
    }
}

/// The result of a window firing: the window identity plus its events.
#[derive(Debug, Clone)]
pub struct WindowTrigger {
    pub spec_id: String,
    pub key: String,
    pub kind: WindowKind,
    pub start: i64,
    pub end: Option<i64>,
    pub events: Vec<StreamEvent>,
}

impl WindowTrigger {
    /// Number of events the window accumulated.
    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    /// Convert into a publishable event.
    ///
    /// The kind is `window.trigger.<kind>` with a `window.trigger`
    /// ancestor, so subscribers can select all triggers or one kind.
    pub fn into_event(self) -> StreamEvent {
        let kind = EventKind::new(format!("window.trigger.{}", self.kind.tag_suffix()))
            .is_a("window.trigger");
        let timestamp = self
            .end
            .or_else(|| self.events.last().map(|e| e.timestamp))
            .unwrap_or(self.start);
        let payload = json!({
            "spec_id": self.spec_id,
            "key": self.key,
            "window_kind": self.kind.as_str(),
            "start": self.start,
            "end": self.end,
            "event_count": self.events.len(),
            "events": self.events,
        });
        StreamEvent::new(kind, payload)
            .with_timestamp(timestamp)
            .with_metadata("spec_id", self.spec_id)
            .with_metadata("window_key", self.key)
    }
}
