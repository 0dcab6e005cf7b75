//! In-memory document backend.
//!
//! The reference [`DocumentBackend`] implementation: documents live in a
//! nested map, realtime updates fan out through an in-process hub. Used by
//! tests and as a scratch backend.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::backend::{DocumentBackend, DocumentWatcher, WatchEvent, WatchHub};
use crate::document::{merge_fields, Document};
use crate::error::StoreError;

/// Document backend holding everything in process memory.
#[derive(Default)]
pub struct MemoryBackend {
    collections: RwLock<HashMap<String, HashMap<String, Document>>>,
    hub: WatchHub,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn watch_key(collection: &str, id: &str) -> String {
        format!("{}.{}", collection, id)
    }
}

#[async_trait]
impl DocumentBackend for MemoryBackend {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError> {
        let collections = self.collections.read().await;

        collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(collection, id))
    }

    async fn put(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        merge: bool,
    ) -> Result<Document, StoreError> {
        let stored = {
            let mut collections = self.collections.write().await;
            let documents = collections.entry(collection.to_string()).or_default();

            let stored = match documents.get(id) {
                Some(existing) if merge => merge_fields(existing.clone(), document),
                _ => document,
            };
            documents.insert(id.to_string(), stored.clone());
            stored
        };

        self.hub
            .publish(
                &Self::watch_key(collection, id),
                WatchEvent::Updated(stored.clone()),
            )
            .await;

        Ok(stored)
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        let removed = {
            let mut collections = self.collections.write().await;
            collections
                .get_mut(collection)
                .and_then(|documents| documents.remove(id))
                .is_some()
        };

        // Deleting an absent document is a no-op.
        if removed {
            self.hub
                .publish(&Self::watch_key(collection, id), WatchEvent::Removed)
                .await;
        }

        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        let collections = self.collections.read().await;

        Ok(collections
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn watch(&self, collection: &str, id: &str) -> Result<DocumentWatcher, StoreError> {
        let current = {
            let collections = self.collections.read().await;
            collections
                .get(collection)
                .and_then(|documents| documents.get(id))
                .cloned()
        };

        Ok(self
            .hub
            .subscribe(&Self::watch_key(collection, id), current)
            .await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, serde_json::Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let backend = MemoryBackend::new();
        backend
            .put("notes", "a", doc(&[("title", json!("hello"))]), false)
            .await
            .unwrap();

        let fetched = backend.get("notes", "a").await.unwrap();
        assert_eq!(fetched["title"], json!("hello"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let backend = MemoryBackend::new();
        let err = backend.get("notes", "missing").await.unwrap_err();
        assert_eq!(err, StoreError::not_found("notes", "missing"));
    }

    #[tokio::test]
    async fn test_put_merge_keeps_untouched_fields() {
        let backend = MemoryBackend::new();
        backend
            .put(
                "notes",
                "a",
                doc(&[("title", json!("hello")), ("pinned", json!(true))]),
                false,
            )
            .await
            .unwrap();

        let stored = backend
            .put("notes", "a", doc(&[("title", json!("edited"))]), true)
            .await
            .unwrap();

        assert_eq!(stored["title"], json!("edited"));
        assert_eq!(stored["pinned"], json!(true));
    }

    #[tokio::test]
    async fn test_put_replace_drops_old_fields() {
        let backend = MemoryBackend::new();
        backend
            .put(
                "notes",
                "a",
                doc(&[("title", json!("hello")), ("pinned", json!(true))]),
                false,
            )
            .await
            .unwrap();

        let stored = backend
            .put("notes", "a", doc(&[("title", json!("edited"))]), false)
            .await
            .unwrap();

        assert_eq!(stored["title"], json!("edited"));
        assert!(!stored.contains_key("pinned"));
    }

    #[tokio::test]
    async fn test_merge_put_on_missing_document_creates_it() {
        let backend = MemoryBackend::new();
        backend
            .put("notes", "a", doc(&[("title", json!("new"))]), true)
            .await
            .unwrap();

        assert!(backend.get("notes", "a").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_removes_document() {
        let backend = MemoryBackend::new();
        backend
            .put("notes", "a", doc(&[("title", json!("x"))]), false)
            .await
            .unwrap();

        backend.delete("notes", "a").await.unwrap();
        assert!(backend.get("notes", "a").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let backend = MemoryBackend::new();
        assert!(backend.delete("notes", "missing").await.is_ok());
    }

    #[tokio::test]
    async fn test_list_collection() {
        let backend = MemoryBackend::new();
        backend
            .put("notes", "a", doc(&[("title", json!("one"))]), false)
            .await
            .unwrap();
        backend
            .put("notes", "b", doc(&[("title", json!("two"))]), false)
            .await
            .unwrap();
        backend
            .put("other", "c", doc(&[("title", json!("three"))]), false)
            .await
            .unwrap();

        let notes = backend.list("notes").await.unwrap();
        assert_eq!(notes.len(), 2);

        let empty = backend.list("nothing").await.unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_watch_sees_current_then_updates() {
        let backend = MemoryBackend::new();
        backend
            .put("notes", "a", doc(&[("v", json!(1))]), false)
            .await
            .unwrap();

        let mut watcher = backend.watch("notes", "a").await.unwrap();
        match watcher.next().await.unwrap() {
            WatchEvent::Updated(d) => assert_eq!(d["v"], json!(1)),
            WatchEvent::Removed => panic!("expected Updated"),
        }

        backend
            .put("notes", "a", doc(&[("v", json!(2))]), false)
            .await
            .unwrap();
        match watcher.next().await.unwrap() {
            WatchEvent::Updated(d) => assert_eq!(d["v"], json!(2)),
            WatchEvent::Removed => panic!("expected Updated"),
        }

        backend.delete("notes", "a").await.unwrap();
        assert!(matches!(watcher.next().await, Some(WatchEvent::Removed)));
    }

    #[tokio::test]
    async fn test_watch_missing_document_has_no_initial_event() {
        let backend = MemoryBackend::new();
        let mut watcher = backend.watch("notes", "a").await.unwrap();

        backend
            .put("notes", "a", doc(&[("v", json!(1))]), false)
            .await
            .unwrap();

        // The first delivery is the put, not an initial snapshot.
        match watcher.next().await.unwrap() {
            WatchEvent::Updated(d) => assert_eq!(d["v"], json!(1)),
            WatchEvent::Removed => panic!("expected Updated"),
        }
    }
}
