//! Checkpoint persistence and crash-recovery tests against the
//! filesystem backend.

use futures::FutureExt;
use resostream::checkpoint::{CompressionType, FileSystemBackend};
use resostream::ingest::WorkProcessor;
use resostream::{EngineConfig, EventKind, RecoveryStrategy, StreamEngine, StreamEvent};
use std::sync::Arc;
use std::time::Duration;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn passthrough_processor() -> WorkProcessor {
    Arc::new(|item| {
        async move { Ok(StreamEvent::new(EventKind::new("ingest.result"), item.payload)) }.boxed()
    })
}

#[tokio::test]
async fn test_restart_resumes_from_latest_checkpoint() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::new("recovering-engine");

    {
        let backend = Arc::new(FileSystemBackend::new(dir.path()));
        let engine =
            StreamEngine::new(config.clone(), backend, passthrough_processor()).unwrap();
        assert_eq!(engine.checkpoint_now().await.unwrap(), 1);
        assert_eq!(engine.checkpoint_now().await.unwrap(), 2);
    }

    // Simulated restart against the same directory
    let backend = Arc::new(FileSystemBackend::new(dir.path()));
    let engine = StreamEngine::new(config, backend, passthrough_processor()).unwrap();

    let outcome = engine.recover_from_failure(RecoveryStrategy::Latest).await;
    assert!(outcome.success);
    let checkpoint = outcome.checkpoint.unwrap();
    assert_eq!(checkpoint.sequence, 2);
    assert_eq!(checkpoint.instance_id, "recovering-engine");
    assert!(checkpoint.components.contains_key("window_manager"));
    assert!(checkpoint.components.contains_key("event_dispatcher"));
    assert!(checkpoint.components.contains_key("ingestion_gate"));

    // Sequence numbering never reuses a recovered number
    assert_eq!(engine.checkpoint_now().await.unwrap(), 3);
}

#[tokio::test]
async fn test_recovery_without_checkpoints_reports_reason() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FileSystemBackend::new(dir.path()));
    let engine = StreamEngine::new(
        EngineConfig::new("cold-engine"),
        backend,
        passthrough_processor(),
    )
    .unwrap();

    let outcome = engine.recover_from_failure(RecoveryStrategy::Latest).await;
    assert!(!outcome.success);
    assert!(outcome.checkpoint.is_none());
    assert!(outcome.reason.unwrap().contains("no checkpoint found"));
}

#[tokio::test]
async fn test_retention_limits_files_on_disk() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FileSystemBackend::new(dir.path()));
    let config = EngineConfig::new("retained-engine").with_max_checkpoints(2);
    let engine = StreamEngine::new(config, backend, passthrough_processor()).unwrap();

    for _ in 0..5 {
        engine.checkpoint_now().await.unwrap();
    }

    let files: Vec<_> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(files.len(), 2);
    assert!(files.contains(&"retained-engine-checkpoint-4.ckpt.json".to_string()));
    assert!(files.contains(&"retained-engine-checkpoint-5.ckpt.json".to_string()));
}

#[tokio::test]
async fn test_compressed_checkpoints_recover() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let config = EngineConfig::new("gz-engine");

    {
        let backend = Arc::new(
            FileSystemBackend::new(dir.path()).with_compression(CompressionType::Gzip),
        );
        let engine =
            StreamEngine::new(config.clone(), backend, passthrough_processor()).unwrap();
        engine.checkpoint_now().await.unwrap();
    }

    let backend =
        Arc::new(FileSystemBackend::new(dir.path()).with_compression(CompressionType::Gzip));
    let engine = StreamEngine::new(config, backend, passthrough_processor()).unwrap();
    let outcome = engine.recover_from_failure(RecoveryStrategy::Latest).await;
    assert!(outcome.success);
    assert_eq!(outcome.checkpoint.unwrap().sequence, 1);
}

#[tokio::test]
async fn test_shutdown_takes_final_checkpoint() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(FileSystemBackend::new(dir.path()));
    let config = EngineConfig::new("closing-engine").with_shutdown_grace(Duration::from_secs(2));
    let engine = StreamEngine::new(config.clone(), backend, passthrough_processor()).unwrap();

    engine.start();
    let summary = engine.shutdown().await;
    assert_eq!(summary.final_checkpoint, Some(1));

    let backend = Arc::new(FileSystemBackend::new(dir.path()));
    let engine = StreamEngine::new(config, backend, passthrough_processor()).unwrap();
    let outcome = engine.recover_from_failure(RecoveryStrategy::Latest).await;
    assert!(outcome.success);
}
