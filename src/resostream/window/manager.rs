//! Window manager
//!
//! Owns the window table, assigns incoming keyed events to live
//! windows, fires trigger conditions, and reclaims expired windows.
//!
//! The table is a shared map guarded by a read/write lock; window
//! creation is atomic check-and-create under the write lock, so two
//! concurrent `add_event` calls for the same key never produce
//! duplicate windows. Each window is mutated under its own lock, so
//! appends and triggers on different windows never contend.
//!
//! Two background tasks keep time moving:
//! - **watermark advance** (short tick) computes `now - allowed_lateness`
//!   and fires every un-triggered bounded window whose end has passed it
//! - **cleanup** (long tick) expires and removes triggered windows idle
//!   past the inactivity period, sessions past their quiet period, and
//!   time windows past `end + allowed_lateness`
//!
//! Both loops are also callable directly (`advance_watermark`,
//! `cleanup_expired`) for tests and administrative use.

use crate::resostream::config::EngineConfig;
use crate::resostream::event::StreamEvent;
use crate::resostream::window::spec::{WindowKind, WindowSpec};
use crate::resostream::window::state::{Window, WindowTrigger};
use chrono::Utc;
use log::{debug, trace, warn};
use serde::Serialize;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Callback invoked by the background tasks for every fired window.
pub type TriggerHandler = Arc<dyn Fn(WindowTrigger) + Send + Sync>;

/// Assigns events to windows and decides when windows fire.
pub struct WindowManager {
    /// Window table, keyed `spec::key[::start]`
    windows: RwLock<HashMap<String, Arc<Mutex<Window>>>>,

    /// Highest watermark observed so far (ms); `i64::MIN` until the
    /// first advance
    watermark: AtomicI64,

    /// Where background-task triggers are delivered
    trigger_handler: RwLock<Option<TriggerHandler>>,

    allowed_lateness_ms: i64,
    watermark_tick: Duration,
    cleanup_tick: Duration,
    idle_expiry_ms: i64,

    windows_created: AtomicU64,
    triggers_emitted: AtomicU64,
    events_accepted: AtomicU64,
    late_events_dropped: AtomicU64,
    windows_reclaimed: AtomicU64,
}

/// Point-in-time counters for monitoring and checkpoints.
#[derive(Debug, Clone, Serialize)]
pub struct WindowManagerStats {
    pub live_windows: usize,
    pub windows_created: u64,
    pub triggers_emitted: u64,
    pub events_accepted: u64,
    pub late_events_dropped: u64,
    pub windows_reclaimed: u64,
    pub current_watermark: Option<i64>,
}

impl WindowManager {
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            windows: RwLock::new(HashMap::new()),
            watermark: AtomicI64::new(i64::MIN),
            trigger_handler: RwLock::new(None),
            allowed_lateness_ms: config.allowed_lateness.as_millis() as i64,
            watermark_tick: config.watermark_tick,
            cleanup_tick: config.cleanup_tick,
            idle_expiry_ms: config.window_idle_expiry.as_millis() as i64,
            windows_created: AtomicU64::new(0),
            triggers_emitted: AtomicU64::new(0),
            events_accepted: AtomicU64::new(0),
            late_events_dropped: AtomicU64::new(0),
            windows_reclaimed: AtomicU64::new(0),
        }
    }

    /// Install the callback the background tasks hand fired windows to.
    pub fn set_trigger_handler(&self, handler: TriggerHandler) {
        *self.trigger_handler.write().unwrap() = Some(handler);
    }

    /// Assign an event to the window(s) its spec and timestamp select,
    /// appending it and evaluating trigger conditions.
    ///
    /// Count and session windows can fire inline; the returned triggers
    /// are those. Time windows fire later through the watermark. A late
    /// event whose window has already expired is dropped silently.
    pub fn add_event(&self, spec: &WindowSpec, event: StreamEvent) -> Vec<WindowTrigger> {
        let key = spec.key_of(&event);
        let now = Utc::now().timestamp_millis();

        match spec.kind {
            WindowKind::TumblingTime => {
                let start = event.timestamp.div_euclid(spec.size_ms) * spec.size_ms;
                let accepted =
                    self.add_to_time_window(spec, &key, start, start + spec.size_ms, event, now);
                self.count_acceptance(accepted);
                Vec::new()
            }
            WindowKind::SlidingTime => {
                // Fan out to every overlapping pane, newest start first
                let mut start = event.timestamp.div_euclid(spec.slide_ms) * spec.slide_ms;
                let mut accepted = false;
                while start + spec.size_ms > event.timestamp {
                    accepted |= self.add_to_time_window(
                        spec,
                        &key,
                        start,
                        start + spec.size_ms,
                        event.clone(),
                        now,
                    );
                    start -= spec.slide_ms;
                }
                self.count_acceptance(accepted);
                Vec::new()
            }
            WindowKind::TumblingCount | WindowKind::SlidingCount => {
                self.add_to_count_window(spec, &key, event, now)
            }
            WindowKind::Session => self.add_to_session_window(spec, &key, event, now),
            WindowKind::Global => {
                let window_key = format!("{}::{}", spec.id, key);
                let window = self.get_or_create(window_key, || {
                    Window::new(spec.id.clone(), key.clone(), spec.kind, 0, None, 0, now)
                });
                let mut win = window.lock().unwrap();
                if win.accepts(event.timestamp) {
                    win.append(event, now);
                    self.count_acceptance(true);
                } else {
                    self.count_acceptance(false);
                }
                Vec::new()
            }
        }
    }

    fn add_to_time_window(
        &self,
        spec: &WindowSpec,
        key: &str,
        start: i64,
        end: i64,
        event: StreamEvent,
        now: i64,
    ) -> bool {
        let window_key = format!("{}::{}::{}", spec.id, key, start);
        let existing = self.windows.read().unwrap().get(&window_key).cloned();
        let window = match existing {
            Some(window) => window,
            None => {
                // The window was never created or has already been
                // reclaimed; past the watermark the event is late.
                if end <= self.watermark.load(Ordering::Relaxed) {
                    trace!(
                        "Late event for window {} (end {} behind watermark)",
                        window_key,
                        end
                    );
                    return false;
                }
                self.get_or_create(window_key, || {
                    Window::new(
                        spec.id.clone(),
                        key.to_string(),
                        spec.kind,
                        start,
                        Some(end),
                        0,
                        now,
                    )
                })
            }
        };

        let mut win = window.lock().unwrap();
        if !win.accepts(event.timestamp) {
            return false;
        }
        win.append(event, now);
        true
    }

    fn add_to_count_window(
        &self,
        spec: &WindowSpec,
        key: &str,
        event: StreamEvent,
        now: i64,
    ) -> Vec<WindowTrigger> {
        let window_key = format!("{}::{}", spec.id, key);
        let window = self.get_or_create(window_key.clone(), || {
            Window::new(spec.id.clone(), key.to_string(), spec.kind, 0, None, 0, now)
        });

        let mut win = window.lock().unwrap();
        win.append(event, now);
        self.count_acceptance(true);

        if win.event_count() < spec.count_size {
            return Vec::new();
        }

        // Full: fire once, then a fresh window takes this key. Sliding
        // count carries the newest size - slide events over.
        win.mark_triggered(now);
        let trigger = win.to_trigger();
        self.triggers_emitted.fetch_add(1, Ordering::Relaxed);

        let generation = win.start + 1;
        let seed = match spec.kind {
            WindowKind::SlidingCount => win.overlap_seed(spec.count_size, spec.count_slide),
            _ => Vec::new(),
        };
        drop(win);

        let mut fresh = Window::new(
            spec.id.clone(),
            key.to_string(),
            spec.kind,
            generation,
            None,
            0,
            now,
        );
        for carried in seed {
            fresh.append(carried, now);
        }
        self.windows
            .write()
            .unwrap()
            .insert(window_key, Arc::new(Mutex::new(fresh)));
        self.windows_created.fetch_add(1, Ordering::Relaxed);

        vec![trigger]
    }

    fn add_to_session_window(
        &self,
        spec: &WindowSpec,
        key: &str,
        event: StreamEvent,
        now: i64,
    ) -> Vec<WindowTrigger> {
        let window_key = format!("{}::{}", spec.id, key);
        let existing = self.windows.read().unwrap().get(&window_key).cloned();

        if let Some(window) = existing {
            let mut win = window.lock().unwrap();
            let within_gap = win
                .last_event_time()
                .map(|last| event.timestamp - last <= spec.session_gap_ms)
                .unwrap_or(true);

            if !win.is_expired() && within_gap {
                win.append(event, now);
                self.count_acceptance(true);
                return Vec::new();
            }

            // Gap exceeded: the old session fires (if it has not yet)
            // and a new one starts at this event.
            let mut fired = Vec::new();
            if win.event_count() > 0 && win.mark_triggered(now) {
                fired.push(win.to_trigger());
                self.triggers_emitted.fetch_add(1, Ordering::Relaxed);
            }
            win.mark_expired();
            drop(win);

            let mut fresh = Window::new(
                spec.id.clone(),
                key.to_string(),
                WindowKind::Session,
                event.timestamp,
                None,
                spec.session_gap_ms,
                now,
            );
            fresh.append(event, now);
            self.count_acceptance(true);
            self.windows
                .write()
                .unwrap()
                .insert(window_key, Arc::new(Mutex::new(fresh)));
            self.windows_created.fetch_add(1, Ordering::Relaxed);
            return fired;
        }

        let window = self.get_or_create(window_key, || {
            Window::new(
                spec.id.clone(),
                key.to_string(),
                WindowKind::Session,
                event.timestamp,
                None,
                spec.session_gap_ms,
                now,
            )
        });
        window.lock().unwrap().append(event, now);
        self.count_acceptance(true);
        Vec::new()
    }

    /// Fire a window manually. No-op (returns `None`) when it already
    /// fired or the key is unknown.
    pub fn trigger_window(&self, window_key: &str) -> Option<WindowTrigger> {
        let window = self.windows.read().unwrap().get(window_key).cloned()?;
        let now = Utc::now().timestamp_millis();
        let mut win = window.lock().unwrap();
        if !win.mark_triggered(now) {
            return None;
        }
        self.triggers_emitted.fetch_add(1, Ordering::Relaxed);
        Some(win.to_trigger())
    }

    /// Advance the watermark and fire every un-triggered bounded window
    /// whose end has passed it. The watermark never moves backwards.
    ///
    /// Called by the background task with `now - allowed_lateness`;
    /// callable directly for deterministic tests and administrative
    /// firing.
    pub fn advance_watermark(&self, watermark_ms: i64) -> Vec<WindowTrigger> {
        self.watermark.fetch_max(watermark_ms, Ordering::Relaxed);
        let watermark = self.watermark.load(Ordering::Relaxed);
        let now = Utc::now().timestamp_millis();

        let snapshot: Vec<Arc<Mutex<Window>>> =
            self.windows.read().unwrap().values().cloned().collect();

        let mut fired = Vec::new();
        for window in snapshot {
            let mut win = window.lock().unwrap();
            if win.is_triggered() || win.is_expired() {
                continue;
            }
            let ready = win
                .watermark_bound()
                .map(|bound| bound <= watermark)
                .unwrap_or(false);
            if ready && win.event_count() > 0 && win.mark_triggered(now) {
                fired.push(win.to_trigger());
                self.triggers_emitted.fetch_add(1, Ordering::Relaxed);
            }
        }
        fired
    }

    /// Expire and remove windows that are done: triggered windows idle
    /// past the inactivity period, sessions past their quiet period,
    /// and time windows past `end + allowed_lateness`. Returns the
    /// number reclaimed.
    pub fn cleanup_expired(&self, now_ms: i64) -> usize {
        let mut map = self.windows.write().unwrap();
        let before = map.len();
        map.retain(|window_key, window| {
            let mut win = window.lock().unwrap();
            let reclaim = if win.is_expired() {
                true
            } else if win.is_triggered() && now_ms - win.last_activity() >= self.idle_expiry_ms {
                true
            } else {
                win.watermark_bound()
                    .map(|bound| bound + self.allowed_lateness_ms <= now_ms)
                    .unwrap_or(false)
            };
            if reclaim {
                win.mark_expired();
                trace!("Reclaiming window {}", window_key);
            }
            !reclaim
        });
        let removed = before - map.len();
        if removed > 0 {
            self.windows_reclaimed
                .fetch_add(removed as u64, Ordering::Relaxed);
            debug!("Window cleanup reclaimed {} windows", removed);
        }
        removed
    }

    /// Fire every remaining un-triggered window, global windows
    /// included. Used at shutdown so long-lived accumulations still
    /// produce a result.
    pub fn drain(&self) -> Vec<WindowTrigger> {
        let now = Utc::now().timestamp_millis();
        let snapshot: Vec<Arc<Mutex<Window>>> =
            self.windows.read().unwrap().values().cloned().collect();

        let mut fired = Vec::new();
        for window in snapshot {
            let mut win = window.lock().unwrap();
            if win.event_count() > 0 && win.mark_triggered(now) {
                fired.push(win.to_trigger());
                self.triggers_emitted.fetch_add(1, Ordering::Relaxed);
            }
        }
        fired
    }

    /// Current watermark, or `None` before the first advance.
    pub fn current_watermark(&self) -> Option<i64> {
        let watermark = self.watermark.load(Ordering::Relaxed);
        if watermark == i64::MIN {
            None
        } else {
            Some(watermark)
        }
    }

    /// Number of live windows in the table.
    pub fn window_count(&self) -> usize {
        self.windows.read().unwrap().len()
    }

    /// Keys of all live windows, for administrative firing.
    pub fn window_keys(&self) -> Vec<String> {
        self.windows.read().unwrap().keys().cloned().collect()
    }

    /// Counter snapshot.
    pub fn stats(&self) -> WindowManagerStats {
        WindowManagerStats {
            live_windows: self.window_count(),
            windows_created: self.windows_created.load(Ordering::Relaxed),
            triggers_emitted: self.triggers_emitted.load(Ordering::Relaxed),
            events_accepted: self.events_accepted.load(Ordering::Relaxed),
            late_events_dropped: self.late_events_dropped.load(Ordering::Relaxed),
            windows_reclaimed: self.windows_reclaimed.load(Ordering::Relaxed),
            current_watermark: self.current_watermark(),
        }
    }

    /// Spawn the watermark advance and cleanup tasks. Both stop when
    /// the shutdown channel fires.
    pub fn start(self: &Arc<Self>, shutdown: &broadcast::Sender<()>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();

        let manager = Arc::clone(self);
        let mut shutdown_rx = shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.watermark_tick);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let watermark =
                            Utc::now().timestamp_millis() - manager.allowed_lateness_ms;
                        let fired = manager.advance_watermark(watermark);
                        manager.emit(fired);
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Watermark task stopping");
                        break;
                    }
                }
            }
        }));

        let manager = Arc::clone(self);
        let mut shutdown_rx = shutdown.subscribe();
        handles.push(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(manager.cleanup_tick);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        manager.cleanup_expired(Utc::now().timestamp_millis());
                    }
                    _ = shutdown_rx.recv() => {
                        debug!("Window cleanup task stopping");
                        break;
                    }
                }
            }
        }));

        handles
    }

    pub(crate) fn emit(&self, triggers: Vec<WindowTrigger>) {
        if triggers.is_empty() {
            return;
        }
        let handler = self.trigger_handler.read().unwrap().clone();
        match handler {
            Some(handler) => {
                for trigger in triggers {
                    handler(trigger);
                }
            }
            None => warn!(
                "{} window triggers fired with no trigger handler installed",
                triggers.len()
            ),
        }
    }

    fn get_or_create(
        &self,
        window_key: String,
        make: impl FnOnce() -> Window,
    ) -> Arc<Mutex<Window>> {
        let mut map = self.windows.write().unwrap();
        match map.entry(window_key) {
            Entry::Occupied(entry) => entry.get().clone(),
            Entry::Vacant(entry) => {
                self.windows_created.fetch_add(1, Ordering::Relaxed);
                entry.insert(Arc::new(Mutex::new(make()))).clone()
            }
        }
    }

    fn count_acceptance(&self, accepted: bool) {
        if accepted {
            self.events_accepted.fetch_add(1, Ordering::Relaxed);
        } else {
            self.late_events_dropped.fetch_add(1, Ordering::Relaxed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resostream::event::EventKind;
    use serde_json::Value;
    use std::time::Duration;

    fn manager() -> WindowManager {
        WindowManager::new(&EngineConfig::default())
    }

    fn key_fn() -> crate::resostream::window::spec::KeyExtractor {
        Arc::new(|event: &StreamEvent| {
            event.metadata.get("key").cloned().unwrap_or_default()
        })
    }

    fn event_at(ts: i64, key: &str) -> StreamEvent {
        StreamEvent::new(EventKind::new("sample"), Value::Null)
            .with_timestamp(ts)
            .with_metadata("key", key)
    }

    #[test]
    fn test_tumbling_time_assignment_and_firing() {
        let manager = manager();
        let spec =
            WindowSpec::tumbling_time("t5", Duration::from_secs(5), key_fn()).unwrap();

        for ts in [0, 4_000, 6_000] {
            assert!(manager.add_event(&spec, event_at(ts, "k")).is_empty());
        }
        assert_eq!(manager.window_count(), 2);

        let mut fired = manager.advance_watermark(i64::MAX);
        fired.sort_by_key(|t| t.start);
        assert_eq!(fired.len(), 2);
        assert_eq!((fired[0].start, fired[0].end), (0, Some(5_000)));
        assert_eq!(fired[0].event_count(), 2);
        assert_eq!((fired[1].start, fired[1].end), (5_000, Some(10_000)));
        assert_eq!(fired[1].event_count(), 1);

        // Triggering is idempotent: a second advance fires nothing
        assert!(manager.advance_watermark(i64::MAX).is_empty());
    }

    #[test]
    fn test_sliding_time_fan_out() {
        let manager = manager();
        let spec = WindowSpec::sliding_time(
            "s10",
            Duration::from_secs(10),
            Duration::from_secs(5),
            key_fn(),
        )
        .unwrap();

        manager.add_event(&spec, event_at(7_000, "k"));
        assert_eq!(manager.window_count(), 2);

        let mut fired = manager.advance_watermark(i64::MAX);
        fired.sort_by_key(|t| t.start);
        assert_eq!(fired.len(), 2);
        assert_eq!((fired[0].start, fired[0].end), (0, Some(10_000)));
        assert_eq!((fired[1].start, fired[1].end), (5_000, Some(15_000)));
        assert_eq!(fired[0].event_count(), 1);
        assert_eq!(fired[1].event_count(), 1);
    }

    #[test]
    fn test_session_merge_and_split() {
        let manager = manager();
        let spec = WindowSpec::session("sess", Duration::from_secs(30), key_fn()).unwrap();

        // Gaps of 20s and 25s merge into one session
        assert!(manager.add_event(&spec, event_at(0, "k")).is_empty());
        assert!(manager.add_event(&spec, event_at(20_000, "k")).is_empty());
        assert!(manager.add_event(&spec, event_at(45_000, "k")).is_empty());
        assert_eq!(manager.window_count(), 1);

        // A 35s gap splits: the old session fires, a new one starts
        let fired = manager.add_event(&spec, event_at(80_000, "k"));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].event_count(), 3);
        assert_eq!(fired[0].start, 0);
        assert_eq!(manager.window_count(), 1);
    }

    #[test]
    fn test_session_fires_via_watermark() {
        let manager = manager();
        let spec = WindowSpec::session("sess", Duration::from_secs(30), key_fn()).unwrap();
        manager.add_event(&spec, event_at(1_000, "k"));

        // Quiet period ends at 31_000
        assert!(manager.advance_watermark(30_999).is_empty());
        let fired = manager.advance_watermark(31_000);
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].event_count(), 1);
    }

    #[test]
    fn test_tumbling_count_restarts_empty() {
        let manager = manager();
        let spec = WindowSpec::tumbling_count("c3", 3, key_fn()).unwrap();

        assert!(manager.add_event(&spec, event_at(1, "k")).is_empty());
        assert!(manager.add_event(&spec, event_at(2, "k")).is_empty());
        let fired = manager.add_event(&spec, event_at(3, "k"));
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].event_count(), 3);

        // Fresh window starts empty
        assert!(manager.add_event(&spec, event_at(4, "k")).is_empty());
        assert!(manager.add_event(&spec, event_at(5, "k")).is_empty());
        assert_eq!(manager.add_event(&spec, event_at(6, "k")).len(), 1);
    }

    #[test]
    fn test_sliding_count_overlaps() {
        let manager = manager();
        let spec = WindowSpec::sliding_count("c3s1", 3, 1, key_fn()).unwrap();

        manager.add_event(&spec, event_at(1, "k"));
        manager.add_event(&spec, event_at(2, "k"));
        let first = manager.add_event(&spec, event_at(3, "k"));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].event_count(), 3);

        // One more event refills the seeded window to size
        let second = manager.add_event(&spec, event_at(4, "k"));
        assert_eq!(second.len(), 1);
        let times: Vec<i64> = second[0].events.iter().map(|e| e.timestamp).collect();
        assert_eq!(times, vec![2, 3, 4]);
    }

    #[test]
    fn test_late_event_dropped_silently() {
        let manager = manager();
        let spec =
            WindowSpec::tumbling_time("t5", Duration::from_secs(5), key_fn()).unwrap();

        manager.add_event(&spec, event_at(1_000, "k"));
        manager.advance_watermark(20_000);
        manager.cleanup_expired(i64::MAX / 2);
        assert_eq!(manager.window_count(), 0);

        // Window [0, 5000) is behind the watermark and gone: dropped
        let fired = manager.add_event(&spec, event_at(2_000, "k"));
        assert!(fired.is_empty());
        assert_eq!(manager.window_count(), 0);
        assert_eq!(manager.stats().late_events_dropped, 1);
    }

    #[test]
    fn test_global_window_only_fires_on_demand() {
        let manager = manager();
        let spec = WindowSpec::global_window("all");

        manager.add_event(&spec, event_at(1, "ignored"));
        manager.add_event(&spec, event_at(2, "ignored"));
        assert!(manager.advance_watermark(i64::MAX).is_empty());

        let fired = manager.trigger_window("all::all").unwrap();
        assert_eq!(fired.event_count(), 2);
        // Second manual trigger is a no-op
        assert!(manager.trigger_window("all::all").is_none());
    }

    #[test]
    fn test_drain_fires_everything_once() {
        let manager = manager();
        let tumbling =
            WindowSpec::tumbling_time("t5", Duration::from_secs(5), key_fn()).unwrap();
        let global = WindowSpec::global_window("all");

        manager.add_event(&tumbling, event_at(1_000, "k"));
        manager.add_event(&global, event_at(2_000, "k"));

        let fired = manager.drain();
        assert_eq!(fired.len(), 2);
        assert!(manager.drain().is_empty());
    }

    #[test]
    fn test_cleanup_reclaims_triggered_idle_windows() {
        let manager = manager();
        let spec =
            WindowSpec::tumbling_time("t5", Duration::from_secs(5), key_fn()).unwrap();
        manager.add_event(&spec, event_at(1_000, "k"));
        manager.advance_watermark(i64::MAX / 4);

        let reclaimed = manager.cleanup_expired(i64::MAX / 2);
        assert_eq!(reclaimed, 1);
        assert_eq!(manager.window_count(), 0);
        assert_eq!(manager.stats().windows_reclaimed, 1);
    }

    #[test]
    fn test_keys_partition_windows() {
        let manager = manager();
        let spec =
            WindowSpec::tumbling_time("t5", Duration::from_secs(5), key_fn()).unwrap();
        manager.add_event(&spec, event_at(1_000, "a"));
        manager.add_event(&spec, event_at(1_000, "b"));
        assert_eq!(manager.window_count(), 2);

        let mut keys = manager.window_keys();
        keys.sort();
        assert_eq!(keys, vec!["t5::a::0".to_string(), "t5::b::0".to_string()]);
    }
}
