//! Checkpoint persistence backends
//!
//! The `CheckpointBackend` trait abstracts where checkpoints live.
//! Two implementations ship with the crate: a filesystem store writing
//! one JSON file per checkpoint (optionally gzip-compressed) and an
//! in-memory store for tests and ephemeral runs.

use crate::resostream::checkpoint::types::{parse_sequence, Checkpoint};
use async_trait::async_trait;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use log::debug;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::RwLock;
use thiserror::Error;

/// Failures at the persistence boundary.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("I/O failure for checkpoint '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("serialization failure for checkpoint '{key}': {source}")]
    Serialization {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("checkpoint '{key}' not found")]
    NotFound { key: String },
}

/// Pluggable checkpoint storage.
#[async_trait]
pub trait CheckpointBackend: Send + Sync {
    /// Persist a checkpoint under the given key, overwriting any
    /// previous value.
    async fn save(&self, key: &str, checkpoint: &Checkpoint) -> Result<(), BackendError>;

    /// Load the checkpoint stored under the key.
    async fn load(&self, key: &str) -> Result<Checkpoint, BackendError>;

    /// List the keys of every checkpoint stored for an instance.
    async fn list(&self, instance_id: &str) -> Result<Vec<String>, BackendError>;

    /// Remove the checkpoint stored under the key.
    async fn delete(&self, key: &str) -> Result<(), BackendError>;

    /// Delete the oldest checkpoints beyond `max_checkpoints`, keeping
    /// the highest sequence numbers. Returns how many were removed.
    async fn cleanup(&self, instance_id: &str, max_checkpoints: usize) -> Result<usize, BackendError> {
        let mut sequenced: Vec<(u64, String)> = self
            .list(instance_id)
            .await?
            .into_iter()
            .filter_map(|key| parse_sequence(&key).map(|seq| (seq, key)))
            .collect();
        sequenced.sort_by(|a, b| b.0.cmp(&a.0));

        let mut removed = 0;
        for (_, key) in sequenced.into_iter().skip(max_checkpoints) {
            self.delete(&key).await?;
            removed += 1;
        }
        Ok(removed)
    }
}

/// Compression applied to checkpoint files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionType {
    #[default]
    None,
    Gzip,
}

/// Filesystem-backed checkpoint store: one file per key under a
/// configured directory.
pub struct FileSystemBackend {
    directory: PathBuf,
    compression: CompressionType,
}

impl FileSystemBackend {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            compression: CompressionType::None,
        }
    }

    /// Enable compression for newly written checkpoints.
    pub fn with_compression(mut self, compression: CompressionType) -> Self {
        self.compression = compression;
        self
    }

    fn extension(&self) -> &'static str {
        match self.compression {
            CompressionType::None => "ckpt.json",
            CompressionType::Gzip => "ckpt.json.gz",
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.directory.join(format!("{}.{}", key, self.extension()))
    }

    fn io_error(key: &str, source: std::io::Error) -> BackendError {
        BackendError::Io {
            key: key.to_string(),
            source,
        }
    }
}

#[async_trait]
impl CheckpointBackend for FileSystemBackend {
    async fn save(&self, key: &str, checkpoint: &Checkpoint) -> Result<(), BackendError> {
        tokio::fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| Self::io_error(key, e))?;

        let json = serde_json::to_vec(checkpoint).map_err(|e| BackendError::Serialization {
            key: key.to_string(),
            source: e,
        })?;
        let bytes = match self.compression {
            CompressionType::None => json,
            CompressionType::Gzip => {
                let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
                encoder
                    .write_all(&json)
                    .and_then(|_| encoder.finish())
                    .map_err(|e| Self::io_error(key, e))?
            }
        };

        let path = self.path_for(key);
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| Self::io_error(key, e))?;
        debug!("Saved checkpoint {} to {}", key, path.display());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Checkpoint, BackendError> {
        let path = self.path_for(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(BackendError::NotFound {
                    key: key.to_string(),
                })
            }
            Err(e) => return Err(Self::io_error(key, e)),
        };

        let json = match self.compression {
            CompressionType::None => bytes,
            CompressionType::Gzip => {
                let mut decoder = GzDecoder::new(bytes.as_slice());
                let mut out = Vec::new();
                decoder
                    .read_to_end(&mut out)
                    .map_err(|e| Self::io_error(key, e))?;
                out
            }
        };

        serde_json::from_slice(&json).map_err(|e| BackendError::Serialization {
            key: key.to_string(),
            source: e,
        })
    }

    async fn list(&self, instance_id: &str) -> Result<Vec<String>, BackendError> {
        let prefix = format!("{}-checkpoint-", instance_id);
        let suffix = format!(".{}", self.extension());

        let mut entries = match tokio::fs::read_dir(&self.directory).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Self::io_error(instance_id, e)),
        };

        let mut keys = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Self::io_error(instance_id, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.starts_with(&prefix) {
                if let Some(key) = name.strip_suffix(&suffix) {
                    keys.push(key.to_string());
                }
            }
        }
        Ok(keys)
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        match tokio::fs::remove_file(self.path_for(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BackendError::NotFound {
                key: key.to_string(),
            }),
            Err(e) => Err(Self::io_error(key, e)),
        }
    }
}

/// In-memory checkpoint store for tests and ephemeral runs.
#[derive(Default)]
pub struct InMemoryBackend {
    checkpoints: RwLock<HashMap<String, Checkpoint>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.checkpoints.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl CheckpointBackend for InMemoryBackend {
    async fn save(&self, key: &str, checkpoint: &Checkpoint) -> Result<(), BackendError> {
        self.checkpoints
            .write()
            .unwrap()
            .insert(key.to_string(), checkpoint.clone());
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Checkpoint, BackendError> {
        self.checkpoints
            .read()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                key: key.to_string(),
            })
    }

    async fn list(&self, instance_id: &str) -> Result<Vec<String>, BackendError> {
        let prefix = format!("{}-checkpoint-", instance_id);
        Ok(self
            .checkpoints
            .read()
            .unwrap()
            .keys()
            .filter(|key| key.starts_with(&prefix))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), BackendError> {
        match self.checkpoints.write().unwrap().remove(key) {
            Some(_) => Ok(()),
            None => Err(BackendError::NotFound {
                key: key.to_string(),
            }),
        }
    }
}
