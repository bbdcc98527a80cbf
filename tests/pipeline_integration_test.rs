//! End-to-end pipeline tests: ingestion through windowing to dispatch,
//! exercised through the public API with real worker pools and
//! background tasks.

use futures::FutureExt;
use resostream::checkpoint::InMemoryBackend;
use resostream::ingest::{IngestionGate, OverflowPolicy, WorkProcessor};
use resostream::{EngineConfig, EventKind, StreamEngine, StreamEvent, StreamError, WindowSpec};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Extracts surface features from a text payload, standing in for the
/// heavier feature extraction a recognition pipeline would run.
fn feature_processor() -> WorkProcessor {
    Arc::new(|item| {
        async move {
            let text = item.payload["text"].as_str().unwrap_or_default();
            let features = json!({
                "tokens": text.split_whitespace().count(),
                "chars": text.chars().count(),
            });
            Ok(StreamEvent::new(EventKind::new("ingest.result"), features)
                .with_priority(item.priority))
        }
        .boxed()
    })
}

async fn wait_until(check: impl Fn() -> bool) {
    for _ in 0..500 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within 5s");
}

#[tokio::test]
async fn test_submit_to_delivery_round_trip() {
    init_logging();
    let backend = Arc::new(InMemoryBackend::new());
    let config = EngineConfig::new("pipeline");
    let engine = StreamEngine::new(config, backend, feature_processor()).unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&received);
    engine.dispatcher().subscribe("ingest.result", Arc::new(move |event: &StreamEvent| {
        sink.lock().unwrap().push(event.payload.clone());
        Ok(())
    }));

    engine.start();
    assert!(engine.submit(json!({"text": "adaptive resonance holds"}), 0).await);

    wait_until(|| !received.lock().unwrap().is_empty()).await;
    let payloads = received.lock().unwrap();
    assert_eq!(payloads[0]["tokens"], 3);
    assert_eq!(payloads[0]["chars"], 24);
    drop(payloads);

    let summary = engine.shutdown().await;
    assert!(summary.all_graceful());
}

#[tokio::test]
async fn test_background_watermark_fires_time_window() {
    init_logging();
    let backend = Arc::new(InMemoryBackend::new());
    let config = EngineConfig::new("watermark-pipeline")
        .with_allowed_lateness(Duration::from_millis(100))
        .with_watermark_tick(Duration::from_millis(20));
    let engine = StreamEngine::new(config, backend, feature_processor()).unwrap();

    let triggers = Arc::new(AtomicU32::new(0));
    let counter = Arc::clone(&triggers);
    engine.dispatcher().subscribe("window.trigger", Arc::new(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }));

    engine.start();

    let spec = WindowSpec::tumbling_time(
        "bursts",
        Duration::from_millis(200),
        Arc::new(|_: &StreamEvent| "k".to_string()),
    )
    .unwrap();
    // Event time is now, so the window closes within ~300ms of wall
    // clock and the watermark task fires it with no further input
    let event = StreamEvent::new(EventKind::new("sample"), json!(1));
    assert!(engine.add_event(&spec, event).is_empty());

    wait_until(|| triggers.load(Ordering::Relaxed) == 1).await;
    engine.shutdown().await;
}

#[tokio::test]
async fn test_drop_oldest_backpressure_counts() {
    init_logging();
    let config = EngineConfig::new("backpressure")
        .with_ingest_queue_size(2)
        .with_overflow_policy(OverflowPolicy::DropOldest);
    let gate = Arc::new(IngestionGate::new(&config, feature_processor()));

    // No workers running: the third submission evicts the first
    assert!(gate.submit(json!({"text": "a"}), 0).await);
    assert!(gate.submit(json!({"text": "b"}), 0).await);
    assert!(gate.submit(json!({"text": "c"}), 0).await);

    let stats = gate.stats();
    assert_eq!(stats.admitted, 3);
    assert_eq!(stats.evicted, 1);
    assert_eq!(stats.queue_depth, 2);
}

#[tokio::test]
async fn test_handler_retry_exhaustion_is_contained() {
    init_logging();
    let backend = Arc::new(InMemoryBackend::new());
    let config = EngineConfig::new("retry-pipeline")
        .with_max_retry_attempts(2)
        .with_retry_base_delay(Duration::from_millis(10));
    let engine = StreamEngine::new(config, backend, feature_processor()).unwrap();

    let attempts = Arc::new(AtomicU32::new(0));
    let healthy = Arc::new(AtomicU32::new(0));

    let counter = Arc::clone(&attempts);
    engine.dispatcher().subscribe("ingest.result", Arc::new(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
        Err(StreamError::handler("category mismatch"))
    }));
    let counter = Arc::clone(&healthy);
    engine.dispatcher().subscribe("ingest.result", Arc::new(move |_| {
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }));

    engine.start();
    engine.submit(json!({"text": "x"}), 0).await;

    wait_until(|| engine.dispatcher().stats().final_failures == 1).await;
    assert_eq!(attempts.load(Ordering::Relaxed), 2);
    // The healthy subscription kept receiving while the broken one retried
    assert_eq!(healthy.load(Ordering::Relaxed), 2);

    // The engine still processes new work afterwards
    engine.submit(json!({"text": "y"}), 0).await;
    wait_until(|| engine.gate().stats().processed == 2).await;
    engine.shutdown().await;
}

#[tokio::test]
async fn test_priority_ordering_end_to_end() {
    init_logging();
    let backend = Arc::new(InMemoryBackend::new());
    let config = EngineConfig::new("priority-pipeline")
        .with_priority_ordering(true)
        .with_dispatch_workers(1);
    let engine = StreamEngine::new(config, backend, feature_processor()).unwrap();

    let order = Arc::new(Mutex::new(Vec::new()));
    let recorder = Arc::clone(&order);
    engine.dispatcher().subscribe("ingest.result", Arc::new(move |event: &StreamEvent| {
        recorder.lock().unwrap().push(event.priority);
        Ok(())
    }));

    // Queue deliveries before any worker starts
    for (text, priority) in [("low", 1), ("urgent", 9), ("mid", 4)] {
        let event = StreamEvent::new(EventKind::new("ingest.result"), json!({ "text": text }))
            .with_priority(priority);
        assert!(engine.publish(event));
    }

    engine.start();
    wait_until(|| order.lock().unwrap().len() == 3).await;
    assert_eq!(*order.lock().unwrap(), vec![9, 4, 1]);
    engine.shutdown().await;
}

#[tokio::test]
async fn test_session_windows_split_per_speaker() {
    init_logging();
    let backend = Arc::new(InMemoryBackend::new());
    let config = EngineConfig::new("session-pipeline");
    let engine = StreamEngine::new(config, backend, feature_processor()).unwrap();
    engine.start();

    let spec = WindowSpec::session(
        "utterances",
        Duration::from_secs(30),
        Arc::new(|event: &StreamEvent| {
            event.metadata.get("speaker").cloned().unwrap_or_default()
        }),
    )
    .unwrap();

    let utterance = |ts: i64, speaker: &str| {
        StreamEvent::new(EventKind::new("sample"), Value::Null)
            .with_timestamp(ts)
            .with_metadata("speaker", speaker)
    };

    // Gaps of 20s and 25s stay inside one session
    assert!(engine.add_event(&spec, utterance(0, "a")).is_empty());
    assert!(engine.add_event(&spec, utterance(20_000, "a")).is_empty());
    assert!(engine.add_event(&spec, utterance(45_000, "a")).is_empty());
    // A different speaker never merges
    assert!(engine.add_event(&spec, utterance(46_000, "b")).is_empty());

    // A 35s gap splits speaker a's session
    let triggers = engine.add_event(&spec, utterance(80_000, "a"));
    assert_eq!(triggers.len(), 1);
    assert_eq!(triggers[0].key, "a");
    assert_eq!(triggers[0].event_count(), 3);

    engine.shutdown().await;
}
