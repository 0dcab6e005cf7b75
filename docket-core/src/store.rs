//! The store facade.
//!
//! `Store` is the public surface of the crate: validated pass-throughs to
//! the document backend, the immediate write path, and the buffered write
//! path through the debounce scheduler. One `Store` owns one timer
//! registry; its shutdown guard answers for every buffered write made
//! through it.

use std::sync::Arc;

use crate::backend::{DocumentBackend, DocumentWatcher};
use crate::buffer::{BufferStore, MemoryBufferStore};
use crate::debounce::{DebounceConfig, WriteScheduler, WriteTicket};
use crate::document::{stamp, Document};
use crate::error::StoreError;
use crate::key::{generate_document_id, validate_collection, DocKey};
use crate::memory::MemoryBackend;
use crate::registry::TimerRegistry;
use crate::shutdown::ShutdownGuard;

/// Document store client with optional write coalescing.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn DocumentBackend>,
    scheduler: WriteScheduler,
    registry: TimerRegistry,
}

impl Store {
    /// Creates a store over the given backend and pending-write buffer.
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        buffer: Arc<dyn BufferStore>,
        config: DebounceConfig,
    ) -> Self {
        let registry = TimerRegistry::new();
        let scheduler =
            WriteScheduler::new(backend.clone(), buffer, registry.clone(), config);

        Self {
            backend,
            scheduler,
            registry,
        }
    }

    /// Store over an in-memory backend and buffer, with default delays.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(MemoryBufferStore::new()),
            DebounceConfig::default(),
        )
    }

    /// Fetches a document.
    pub async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let key = DocKey::new(collection, id)?;
        self.backend.get(key.collection(), key.id()).await
    }

    /// Creates a document under a generated id and returns the stored
    /// copy, metadata included.
    pub async fn add(&self, collection: &str, document: Document) -> Result<Document, StoreError> {
        let id = generate_document_id();
        self.put(collection, &id, document, true).await
    }

    /// Writes a document immediately: one awaited backend put, no timers.
    ///
    /// With `overwrite` the stored document is replaced whole and its
    /// creation date reset; otherwise fields merge over the stored
    /// document.
    pub async fn put(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        overwrite: bool,
    ) -> Result<Document, StoreError> {
        let key = DocKey::new(collection, id)?;
        let stamped = stamp(document, key.id(), overwrite);

        self.backend
            .put(key.collection(), key.id(), stamped, !overwrite)
            .await
    }

    /// Deletes a document. Deleting an absent document is a no-op.
    pub async fn remove(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let key = DocKey::new(collection, id)?;
        self.backend.delete(key.collection(), key.id()).await
    }

    /// Lists every document in a collection.
    pub async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        validate_collection(collection)?;
        self.backend.list(collection).await
    }

    /// Subscribes to realtime updates for a document.
    pub async fn watch(&self, collection: &str, id: &str) -> Result<DocumentWatcher, StoreError> {
        let key = DocKey::new(collection, id)?;
        self.backend.watch(key.collection(), key.id()).await
    }

    /// Writes a document, routed by `use_delay`.
    ///
    /// `use_delay = false` performs the immediate path and returns an
    /// already-resolved ticket. `use_delay = true` buffers the write
    /// through the debounce scheduler; the ticket resolves when the
    /// coalesced cycle flushes. Identifier validation fails fast either
    /// way, before any side effect.
    pub async fn write(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        overwrite: bool,
        use_delay: bool,
    ) -> Result<WriteTicket, StoreError> {
        let key = DocKey::new(collection, id)?;

        if use_delay {
            self.scheduler.write(&key, document, overwrite).await
        } else {
            let outcome = self
                .put(key.collection(), key.id(), document, overwrite)
                .await;
            Ok(WriteTicket::ready(outcome))
        }
    }

    /// Guard that blocks termination while buffered writes are unflushed.
    pub fn shutdown_guard(&self) -> ShutdownGuard {
        ShutdownGuard::new(self.registry.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{FIELD_DATE_CREATED, FIELD_DATE_LAST_MODIFIED, FIELD_DOCUMENT_ID};
    use serde_json::json;
    use std::time::Duration;

    fn fast_store() -> Store {
        Store::new(
            Arc::new(MemoryBackend::new()),
            Arc::new(MemoryBufferStore::new()),
            DebounceConfig {
                first_delay: Duration::from_millis(20),
                repeat_delay: Duration::from_millis(10),
            },
        )
    }

    fn doc(pairs: &[(&str, serde_json::Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_add_stamps_creation_metadata() {
        let store = fast_store();

        let stored = store
            .add("notes", doc(&[("title", json!("hello"))]))
            .await
            .unwrap();

        assert_eq!(stored[FIELD_DATE_CREATED], stored[FIELD_DATE_LAST_MODIFIED]);
        let id = stored[FIELD_DOCUMENT_ID].as_str().unwrap();
        assert_eq!(id.len(), 36);

        let fetched = store.get("notes", id).await.unwrap();
        assert_eq!(fetched["title"], json!("hello"));
    }

    #[tokio::test]
    async fn test_put_merge_preserves_creation_date() {
        let store = fast_store();
        let created = store
            .add("notes", doc(&[("title", json!("hello"))]))
            .await
            .unwrap();
        let id = created[FIELD_DOCUMENT_ID].as_str().unwrap().to_string();

        let edited = store
            .put("notes", &id, doc(&[("title", json!("edited"))]), false)
            .await
            .unwrap();

        assert_eq!(edited[FIELD_DATE_CREATED], created[FIELD_DATE_CREATED]);
        assert_eq!(edited["title"], json!("edited"));
    }

    #[tokio::test]
    async fn test_put_overwrite_resets_creation_date() {
        let store = fast_store();
        let created = store
            .add("notes", doc(&[("old", json!(true))]))
            .await
            .unwrap();
        let id = created[FIELD_DOCUMENT_ID].as_str().unwrap().to_string();

        tokio::time::sleep(Duration::from_millis(5)).await;
        let replaced = store
            .put("notes", &id, doc(&[("new", json!(true))]), true)
            .await
            .unwrap();

        assert!(!replaced.contains_key("old"));
        assert_ne!(replaced[FIELD_DATE_CREATED], created[FIELD_DATE_CREATED]);
    }

    #[tokio::test]
    async fn test_immediate_write_arms_no_timers() {
        let store = fast_store();

        let ticket = store
            .write("notes", "a", doc(&[("v", json!(1))]), false, false)
            .await
            .unwrap();

        // Resolved before any timer could exist.
        assert!(store.registry.is_idle());
        let stored = ticket.wait().await.unwrap();
        assert_eq!(stored["v"], json!(1));
        assert!(store.shutdown_guard().check().is_ok());
    }

    #[tokio::test]
    async fn test_buffered_write_blocks_shutdown_until_flushed() {
        let store = fast_store();

        let ticket = store
            .write("notes", "a", doc(&[("v", json!(1))]), false, true)
            .await
            .unwrap();

        let guard = store.shutdown_guard();
        let pending = guard.check().unwrap_err();
        assert_eq!(pending.keys, vec!["notes.a"]);

        ticket.wait().await.unwrap();
        guard.wait_idle().await;
        assert!(guard.check().is_ok());
        assert_eq!(store.get("notes", "a").await.unwrap()["v"], json!(1));
    }

    #[tokio::test]
    async fn test_invalid_arguments_fail_fast() {
        let store = fast_store();

        let err = store
            .write("", "a", doc(&[("v", json!(1))]), false, true)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArguments(_)));

        let err = store
            .write("notes", "", doc(&[("v", json!(1))]), false, false)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidArguments(_)));

        // No side effects: nothing buffered, nothing stored.
        assert!(store.registry.is_idle());
        assert!(store.list("notes").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_remove_and_list() {
        let store = fast_store();
        store
            .put("notes", "a", doc(&[("v", json!(1))]), false)
            .await
            .unwrap();
        store
            .put("notes", "b", doc(&[("v", json!(2))]), false)
            .await
            .unwrap();

        assert_eq!(store.list("notes").await.unwrap().len(), 2);

        store.remove("notes", "a").await.unwrap();
        assert_eq!(store.list("notes").await.unwrap().len(), 1);
        assert!(matches!(
            store.get("notes", "a").await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_watch_through_facade() {
        let store = fast_store();
        let mut watcher = store.watch("notes", "a").await.unwrap();

        store
            .put("notes", "a", doc(&[("v", json!(1))]), false)
            .await
            .unwrap();

        match watcher.next().await.unwrap() {
            crate::backend::WatchEvent::Updated(d) => assert_eq!(d["v"], json!(1)),
            crate::backend::WatchEvent::Removed => panic!("expected Updated"),
        }
    }

    #[tokio::test]
    async fn test_buffered_writes_coalesce_through_facade() {
        let store = fast_store();

        let t1 = store
            .write("notes", "a", doc(&[("a", json!(1))]), false, true)
            .await
            .unwrap();
        let t2 = store
            .write("notes", "a", doc(&[("b", json!(2))]), false, true)
            .await
            .unwrap();

        let stored = t2.wait().await.unwrap();
        t1.wait().await.unwrap();

        assert_eq!(stored["a"], json!(1));
        assert_eq!(stored["b"], json!(2));
    }
}
