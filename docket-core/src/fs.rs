//! Filesystem document backend.
//!
//! Stores one JSON file per document:
//! ```text
//! <DATA_DIR>/
//!   <collection>/
//!     <id>.json
//! ```
//!
//! Writes go through a temp file plus rename so a crash never leaves a
//! half-written document behind. Realtime watch is in-process: watchers
//! see changes made through this backend instance.

use async_trait::async_trait;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::backend::{DocumentBackend, DocumentWatcher, WatchEvent, WatchHub};
use crate::document::{merge_fields, Document};
use crate::error::StoreError;
use crate::key::{validate_collection, DocKey};

/// Document backend persisting each document as a JSON file.
pub struct FileBackend {
    data_dir: PathBuf,
    hub: WatchHub,
}

impl FileBackend {
    /// Creates a backend rooted at `data_dir`. The directory is created
    /// lazily on the first write.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            hub: WatchHub::default(),
        }
    }

    /// The backing directory.
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn doc_path(&self, key: &DocKey) -> PathBuf {
        self.data_dir
            .join(key.collection())
            .join(format!("{}.json", key.id()))
    }

    fn read_document(path: &Path) -> Result<Option<Document>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => {
                let document: Document = serde_json::from_slice(&bytes).map_err(|e| {
                    StoreError::Backend(format!("corrupt document {}: {}", path.display(), e))
                })?;
                Ok(Some(document))
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, e)),
        }
    }

    fn write_document(&self, path: &Path, document: &Document) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }

        let bytes = serde_json::to_vec_pretty(document)
            .map_err(|e| StoreError::Backend(format!("serialize {}: {}", path.display(), e)))?;

        // Write atomically using temp file + rename.
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, bytes).map_err(|e| io_error(&temp_path, e))?;
        fs::rename(&temp_path, path).map_err(|e| io_error(path, e))?;

        Ok(())
    }
}

fn io_error(path: &Path, e: io::Error) -> StoreError {
    StoreError::Backend(format!("I/O error for {}: {}", path.display(), e))
}

#[async_trait]
impl DocumentBackend for FileBackend {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let key = DocKey::new(collection, id)?;

        Self::read_document(&self.doc_path(&key))?
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        merge: bool,
    ) -> Result<Document, StoreError> {
        let key = DocKey::new(collection, id)?;
        let path = self.doc_path(&key);

        let stored = match Self::read_document(&path)? {
            Some(existing) if merge => merge_fields(existing, document),
            _ => document,
        };
        self.write_document(&path, &stored)?;

        self.hub
            .publish(&key.to_string(), WatchEvent::Updated(stored.clone()))
            .await;

        Ok(stored)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let key = DocKey::new(collection, id)?;
        let path = self.doc_path(&key);

        match fs::remove_file(&path) {
            Ok(()) => {
                self.hub.publish(&key.to_string(), WatchEvent::Removed).await;
                Ok(())
            }
            // Deleting an absent document is a no-op.
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(&path, e)),
        }
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        let dir = self.data_dir.join(collection);

        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&dir, e)),
        };

        let mut documents = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| io_error(&dir, e))?.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            if let Some(document) = Self::read_document(&path)? {
                documents.push(document);
            }
        }

        Ok(documents)
    }

    async fn watch(&self, collection: &str, id: &str) -> Result<DocumentWatcher, StoreError> {
        let key = DocKey::new(collection, id)?;
        let current = Self::read_document(&self.doc_path(&key))?;

        Ok(self.hub.subscribe(&key.to_string(), current).await)
    }
}
