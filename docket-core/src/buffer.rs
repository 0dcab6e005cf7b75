//! Pending-write buffer store.
//!
//! Buffered writes wait out their debounce window in a local key-value
//! cache, keyed by `"{collection}.{id}"`. The store is injected so the
//! scheduler can run against memory in tests and against a spool
//! directory in the binary.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

use crate::document::Document;
use crate::error::StoreError;

/// A document awaiting flush, with its flush mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRecord {
    /// Latest merged payload, including injected metadata.
    pub document: Document,
    /// True: flush merges fields over the stored document. False: flush
    /// replaces it whole.
    pub merge_on_flush: bool,
}

/// Key-value cache of documents awaiting flush.
#[async_trait]
pub trait BufferStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<PendingRecord>, StoreError>;

    async fn set(&self, key: &str, record: PendingRecord) -> Result<(), StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Buffer store holding records in process memory.
#[derive(Default)]
pub struct MemoryBufferStore {
    records: RwLock<HashMap<String, PendingRecord>>,
}

impl MemoryBufferStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BufferStore for MemoryBufferStore {
    async fn get(&self, key: &str) -> Result<Option<PendingRecord>, StoreError> {
        Ok(self.records.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, record: PendingRecord) -> Result<(), StoreError> {
        self.records.write().await.insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records.write().await.remove(key);
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.records.read().await.keys().cloned().collect())
    }
}

/// Buffer store spooling each record to a JSON file, durable across
/// process restarts.
pub struct FileBufferStore {
    spool_dir: PathBuf,
}

impl FileBufferStore {
    /// Creates a store spooling into `spool_dir`. The directory is created
    /// lazily on the first write.
    pub fn new(spool_dir: impl Into<PathBuf>) -> Self {
        Self {
            spool_dir: spool_dir.into(),
        }
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.spool_dir.join(format!("{}.pending", key))
    }
}

fn io_error(path: &Path, e: io::Error) -> StoreError {
    StoreError::Buffer(format!("I/O error for {}: {}", path.display(), e))
}

#[async_trait]
impl BufferStore for FileBufferStore {
    async fn get(&self, key: &str) -> Result<Option<PendingRecord>, StoreError> {
        let path = self.record_path(key);

        match fs::read(&path) {
            Ok(bytes) => {
                let record = serde_json::from_slice(&bytes).map_err(|e| {
                    StoreError::Buffer(format!("corrupt record {}: {}", path.display(), e))
                })?;
                Ok(Some(record))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn set(&self, key: &str, record: PendingRecord) -> Result<(), StoreError> {
        fs::create_dir_all(&self.spool_dir).map_err(|e| io_error(&self.spool_dir, e))?;

        let path = self.record_path(key);
        let bytes = serde_json::to_vec(&record)
            .map_err(|e| StoreError::Buffer(format!("serialize {}: {}", path.display(), e)))?;

        // Write atomically using temp file + rename.
        let temp_path = path.with_extension("pending.tmp");
        fs::write(&temp_path, bytes).map_err(|e| io_error(&temp_path, e))?;
        fs::rename(&temp_path, &path).map_err(|e| io_error(&path, e))?;

        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.record_path(key);

        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = match fs::read_dir(&self.spool_dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&self.spool_dir, e)),
        };

        let mut keys = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&self.spool_dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("pending") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                keys.push(stem.to_string());
            }
        }

        Ok(keys)
    }
}
