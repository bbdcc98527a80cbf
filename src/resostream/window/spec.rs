//! Window specifications
//!
//! A `WindowSpec` is the immutable description of one logical window
//! family: its kind, sizing, and how partition keys are extracted from
//! events. Many live windows are created from one spec.

use crate::resostream::error::{StreamError, StreamResult};
use crate::resostream::event::StreamEvent;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Extracts the partition key from an event.
pub type KeyExtractor = Arc<dyn Fn(&StreamEvent) -> String + Send + Sync>;

/// The supported window kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum WindowKind {
    TumblingTime,
    SlidingTime,
    TumblingCount,
    SlidingCount,
    Session,
    Global,
}

impl WindowKind {
    /// Uppercase name used in logs and error context.
    pub fn as_str(&self) -> &'static str {
        match self {
            WindowKind::TumblingTime => "TUMBLING_TIME",
            WindowKind::SlidingTime => "SLIDING_TIME",
            WindowKind::TumblingCount => "TUMBLING_COUNT",
            WindowKind::SlidingCount => "SLIDING_COUNT",
            WindowKind::Session => "SESSION",
            WindowKind::Global => "GLOBAL",
        }
    }

    /// Tag suffix used when a trigger is published as an event,
    /// e.g. `window.trigger.session`.
    pub fn tag_suffix(&self) -> &'static str {
        match self {
            WindowKind::TumblingTime => "tumbling_time",
            WindowKind::SlidingTime => "sliding_time",
            WindowKind::TumblingCount => "tumbling_count",
            WindowKind::SlidingCount => "sliding_count",
            WindowKind::Session => "session",
            WindowKind::Global => "global",
        }
    }
}

impl fmt::Display for WindowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable configuration for one window family.
#[derive(Clone)]
pub struct WindowSpec {
    /// Spec identifier, part of every window key
    pub id: String,
    /// Window kind
    pub kind: WindowKind,
    /// Time size in milliseconds (time windows)
    pub(crate) size_ms: i64,
    /// Slide interval in milliseconds (sliding time windows)
    pub(crate) slide_ms: i64,
    /// Event count that fills the window (count windows)
    pub(crate) count_size: usize,
    /// Events between triggers (sliding count windows)
    pub(crate) count_slide: usize,
    /// Session inactivity gap in milliseconds (session windows)
    pub(crate) session_gap_ms: i64,
    /// Partition key extraction
    pub(crate) key_extractor: KeyExtractor,
}

impl WindowSpec {
    /// Aligned, non-overlapping time windows of a fixed size.
    pub fn tumbling_time(
        id: impl Into<String>,
        size: Duration,
        key_extractor: KeyExtractor,
    ) -> StreamResult<Self> {
        let size_ms = duration_ms(size, "window size")?;
        Ok(Self {
            id: id.into(),
            kind: WindowKind::TumblingTime,
            size_ms,
            slide_ms: 0,
            count_size: 0,
            count_slide: 0,
            session_gap_ms: 0,
            key_extractor,
        })
    }

    /// Overlapping time windows advancing by a slide interval.
    ///
    /// One event lands in up to `size / slide` windows.
    pub fn sliding_time(
        id: impl Into<String>,
        size: Duration,
        slide: Duration,
        key_extractor: KeyExtractor,
    ) -> StreamResult<Self> {
        let size_ms = duration_ms(size, "window size")?;
        let slide_ms = duration_ms(slide, "slide interval")?;
        if slide_ms > size_ms {
            return Err(StreamError::configuration(format!(
                "slide interval {}ms must not exceed window size {}ms",
                slide_ms, size_ms
            )));
        }
        Ok(Self {
            id: id.into(),
            kind: WindowKind::SlidingTime,
            size_ms,
            slide_ms,
            count_size: 0,
            count_slide: 0,
            session_gap_ms: 0,
            key_extractor,
        })
    }

    /// A window that fills after a fixed number of events, then restarts
    /// empty.
    pub fn tumbling_count(
        id: impl Into<String>,
        count_size: usize,
        key_extractor: KeyExtractor,
    ) -> StreamResult<Self> {
        if count_size == 0 {
            return Err(StreamError::configuration("count size must be at least 1"));
        }
        Ok(Self {
            id: id.into(),
            kind: WindowKind::TumblingCount,
            size_ms: 0,
            slide_ms: 0,
            count_size,
            count_slide: 0,
            session_gap_ms: 0,
            key_extractor,
        })
    }

    /// A count window that restarts keeping the newest `count_size -
    /// count_slide` events, so consecutive triggers overlap.
    pub fn sliding_count(
        id: impl Into<String>,
        count_size: usize,
        count_slide: usize,
        key_extractor: KeyExtractor,
    ) -> StreamResult<Self> {
        if count_size == 0 {
            return Err(StreamError::configuration("count size must be at least 1"));
        }
        if count_slide == 0 || count_slide > count_size {
            return Err(StreamError::configuration(format!(
                "count slide {} must be between 1 and the count size {}",
                count_slide, count_size
            )));
        }
        Ok(Self {
            id: id.into(),
            kind: WindowKind::SlidingCount,
            size_ms: 0,
            slide_ms: 0,
            count_size,
            count_slide,
            session_gap_ms: 0,
            key_extractor,
        })
    }

    /// Gap-based windows: events closer than `gap` merge into one
    /// session.
    pub fn session(
        id: impl Into<String>,
        gap: Duration,
        key_extractor: KeyExtractor,
    ) -> StreamResult<Self> {
        let session_gap_ms = duration_ms(gap, "session gap")?;
        Ok(Self {
            id: id.into(),
            kind: WindowKind::Session,
            size_ms: 0,
            slide_ms: 0,
            count_size: 0,
            count_slide: 0,
            session_gap_ms,
            key_extractor,
        })
    }

    /// One persistent window per key; fires only on explicit trigger or
    /// shutdown drain.
    pub fn global_window(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: WindowKind::Global,
            size_ms: 0,
            slide_ms: 0,
            count_size: 0,
            count_slide: 0,
            session_gap_ms: 0,
            key_extractor: Arc::new(|_| "all".to_string()),
        }
    }

    /// Resolve the partition key for an event.
    pub fn key_of(&self, event: &StreamEvent) -> String {
        (self.key_extractor)(event)
    }
}

impl fmt::Debug for WindowSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowSpec")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("size_ms", &self.size_ms)
            .field("slide_ms", &self.slide_ms)
            .field("count_size", &self.count_size)
            .field("count_slide", &self.count_slide)
            .field("session_gap_ms", &self.session_gap_ms)
            .finish()
    }
}

fn duration_ms(value: Duration, what: &str) -> StreamResult<i64> {
    let ms = value.as_millis();
    if ms == 0 {
        return Err(StreamError::configuration(format!(
            "{} must be positive",
            what
        )));
    }
    i64::try_from(ms)
        .map_err(|_| StreamError::configuration(format!("{} of {}ms is out of range", what, ms)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resostream::event::EventKind;
    use serde_json::Value;

    fn key_fn() -> KeyExtractor {
        Arc::new(|event: &StreamEvent| {
            event.metadata.get("key").cloned().unwrap_or_default()
        })
    }

    #[test]
    fn test_constructors_validate_sizes() {
        assert!(WindowSpec::tumbling_time("t", Duration::from_secs(5), key_fn()).is_ok());
        assert!(WindowSpec::tumbling_time("t", Duration::ZERO, key_fn()).is_err());
        assert!(
            WindowSpec::sliding_time("s", Duration::from_secs(5), Duration::from_secs(10), key_fn())
                .is_err()
        );
        assert!(WindowSpec::tumbling_count("c", 0, key_fn()).is_err());
        assert!(WindowSpec::sliding_count("c", 10, 0, key_fn()).is_err());
        assert!(WindowSpec::sliding_count("c", 10, 11, key_fn()).is_err());
        assert!(WindowSpec::session("g", Duration::ZERO, key_fn()).is_err());
    }

    #[test]
    fn test_key_extraction() {
        let spec = WindowSpec::session("sess", Duration::from_secs(30), key_fn()).unwrap();
        let event = StreamEvent::new(EventKind::new("sample"), Value::Null)
            .with_metadata("key", "speaker-2");
        assert_eq!(spec.key_of(&event), "speaker-2");
    }

    #[test]
    fn test_global_window_uses_single_key() {
        let spec = WindowSpec::global_window("all-time");
        let event = StreamEvent::new(EventKind::new("sample"), Value::Null);
        assert_eq!(spec.key_of(&event), "all");
        assert_eq!(spec.kind, WindowKind::Global);
    }
}
