//! The document backend seam.
//!
//! The store core never talks to a concrete service; everything goes
//! through [`DocumentBackend`]. Realtime subscriptions are modelled as a
//! channel-backed [`DocumentWatcher`]: the current document (when one
//! exists) is delivered immediately, every later update follows in order,
//! and dropping the watcher unsubscribes.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{mpsc, RwLock};

use crate::document::Document;
use crate::error::StoreError;

/// A change observed on a watched document.
#[derive(Debug, Clone)]
pub enum WatchEvent {
    /// The document was created or updated; carries the stored copy.
    Updated(Document),
    /// The document was deleted.
    Removed,
}

/// Receives realtime updates for a single document.
///
/// Dropping the watcher unsubscribes; the backend prunes the channel on
/// the next publish.
pub struct DocumentWatcher {
    rx: mpsc::UnboundedReceiver<WatchEvent>,
}

impl DocumentWatcher {
    pub(crate) fn new(rx: mpsc::UnboundedReceiver<WatchEvent>) -> Self {
        Self { rx }
    }

    /// Waits for the next event. Returns `None` once the backend side is
    /// gone.
    pub async fn next(&mut self) -> Option<WatchEvent> {
        self.rx.recv().await
    }
}

/// The document-store backend contract.
///
/// `put` with `merge = true` performs a shallow field merge over the
/// stored document; with `merge = false` it replaces the document whole.
/// Both return the stored copy.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> Result<Document, StoreError>;

    async fn put(
        &self,
        collection: &str,
        id: &str,
        document: Document,
        merge: bool,
    ) -> Result<Document, StoreError>;

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    async fn watch(&self, collection: &str, id: &str) -> Result<DocumentWatcher, StoreError>;
}

/// Fans watch events out to subscribers, per document key.
///
/// Senders that fail are departed subscribers and are pruned on the next
/// publish.
#[derive(Default)]
pub(crate) struct WatchHub {
    watchers: RwLock<HashMap<String, Vec<mpsc::UnboundedSender<WatchEvent>>>>,
}

impl WatchHub {
    /// Registers a subscriber for a key, delivering `current` first when
    /// the document already exists.
    pub async fn subscribe(&self, key: &str, current: Option<Document>) -> DocumentWatcher {
        let (tx, rx) = mpsc::unbounded_channel();

        if let Some(document) = current {
            let _ = tx.send(WatchEvent::Updated(document));
        }

        let mut watchers = self.watchers.write().await;
        watchers.entry(key.to_string()).or_default().push(tx);

        DocumentWatcher::new(rx)
    }

    /// Publishes an event to every live subscriber of a key.
    pub async fn publish(&self, key: &str, event: WatchEvent) {
        let mut watchers = self.watchers.write().await;

        if let Some(senders) = watchers.get_mut(key) {
            senders.retain(|tx| tx.send(event.clone()).is_ok());
            if senders.is_empty() {
                watchers.remove(key);
            }
        }
    }
}
