//! Write coalescing and debounce.
//!
//! Buffered writes do not go straight to the backend. The first write for
//! a document key caches the payload and arms a timer with a long grace
//! period; every further write before the timer fires merges into the
//! cached document and restarts the timer with a shorter delay, so a burst
//! of edits converges quickly while still collapsing into a single backend
//! write. When the timer fires the cached document is flushed with exactly
//! one `put` and every caller of the cycle is handed the same outcome.
//!
//! Per-key state machine: IDLE (nothing cached) -> BUFFERED (record
//! cached, timer armed) -> FLUSHING (backend put in flight) -> IDLE. A
//! write that lands while a flush is in flight starts a fresh BUFFERED
//! cycle; the in-flight snapshot is never touched.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

use crate::backend::DocumentBackend;
use crate::buffer::{BufferStore, PendingRecord};
use crate::document::{merge_fields, stamp, Document};
use crate::error::StoreError;
use crate::key::DocKey;
use crate::registry::{TimerId, TimerRegistry};

/// Debounce delays. Not adjustable per call.
#[derive(Debug, Clone)]
pub struct DebounceConfig {
    /// Grace period after the first write of a cycle.
    pub first_delay: Duration,
    /// Delay after each further write; shorter, so rapid edit bursts
    /// converge instead of being pushed out indefinitely.
    pub repeat_delay: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            first_delay: Duration::from_secs(5),
            repeat_delay: Duration::from_secs(3),
        }
    }
}

/// Outcome of a flush cycle: the stored document, or the error that ended
/// the cycle.
pub type WriteOutcome = Result<Document, StoreError>;

/// Resolves with the outcome of the flush cycle a write joined.
///
/// Every write coalesced into one cycle receives the same outcome.
#[derive(Debug)]
pub struct WriteTicket {
    inner: TicketInner,
}

#[derive(Debug)]
enum TicketInner {
    Ready(WriteOutcome),
    Pending(oneshot::Receiver<WriteOutcome>),
}

impl WriteTicket {
    pub(crate) fn ready(outcome: WriteOutcome) -> Self {
        Self {
            inner: TicketInner::Ready(outcome),
        }
    }

    fn pending(rx: oneshot::Receiver<WriteOutcome>) -> Self {
        Self {
            inner: TicketInner::Pending(rx),
        }
    }

    /// Waits for the flush cycle to finish.
    pub async fn wait(self) -> WriteOutcome {
        match self.inner {
            TicketInner::Ready(outcome) => outcome,
            TicketInner::Pending(rx) => rx.await.unwrap_or_else(|_| {
                Err(StoreError::Backend(
                    "flush task dropped before completing".to_string(),
                ))
            }),
        }
    }
}

/// One key's buffered state: the cached record, the armed timer, and the
/// callers waiting on the cycle.
struct Entry {
    record: PendingRecord,
    generation: u64,
    timer_id: TimerId,
    handle: JoinHandle<()>,
    waiters: Vec<oneshot::Sender<WriteOutcome>>,
}

/// The debounce scheduler. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct WriteScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    backend: Arc<dyn DocumentBackend>,
    buffer: Arc<dyn BufferStore>,
    registry: TimerRegistry,
    config: DebounceConfig,
    /// Bookkeeping for BUFFERED keys. Held across buffer-store awaits but
    /// never across a backend flush, so one key's in-flight put cannot
    /// stall another key's timers.
    entries: Mutex<HashMap<String, Entry>>,
    generations: AtomicU64,
}

impl WriteScheduler {
    pub fn new(
        backend: Arc<dyn DocumentBackend>,
        buffer: Arc<dyn BufferStore>,
        registry: TimerRegistry,
        config: DebounceConfig,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                backend,
                buffer,
                registry,
                config,
                entries: Mutex::new(HashMap::new()),
                generations: AtomicU64::new(0),
            }),
        }
    }

    /// Buffers a write for later flush.
    ///
    /// The first write of a cycle caches the stamped document and arms the
    /// long grace-period timer. Further writes coalesce: with `overwrite`
    /// the cached document is replaced whole and the eventual flush
    /// replaces the stored document too; otherwise fields merge with the
    /// new values winning. Once a cycle has seen an overwrite, its flush
    /// stays a full replacement - a later merge edit must not resurrect
    /// fields the overwrite deleted.
    pub async fn write(
        &self,
        key: &DocKey,
        document: Document,
        overwrite: bool,
    ) -> Result<WriteTicket, StoreError> {
        let stamped = stamp(document, key.id(), overwrite);
        let key_str = key.to_string();

        let mut entries = self.inner.entries.lock().await;
        let (tx, rx) = oneshot::channel();

        if let Some(entry) = entries.get_mut(&key_str) {
            // BUFFERED: coalesce into the cached record and restart the
            // timer with the shorter repeat delay.
            let record = if overwrite {
                PendingRecord {
                    document: stamped,
                    merge_on_flush: false,
                }
            } else {
                PendingRecord {
                    document: merge_fields(entry.record.document.clone(), stamped),
                    merge_on_flush: entry.record.merge_on_flush,
                }
            };
            self.inner.buffer.set(&key_str, record.clone()).await?;

            entry.handle.abort();
            self.inner.registry.deregister(entry.timer_id);

            entry.record = record;
            entry.generation = self.next_generation();
            entry.timer_id = self.inner.registry.register(&key_str);
            entry.handle =
                self.arm_timer(key_str.clone(), entry.generation, self.inner.config.repeat_delay);
            entry.waiters.push(tx);

            tracing::debug!("Coalesced buffered write for {}", key_str);
        } else {
            // IDLE: start a cycle with the first-write grace period.
            let record = PendingRecord {
                document: stamped,
                merge_on_flush: !overwrite,
            };
            self.inner.buffer.set(&key_str, record.clone()).await?;

            let generation = self.next_generation();
            let timer_id = self.inner.registry.register(&key_str);
            let handle =
                self.arm_timer(key_str.clone(), generation, self.inner.config.first_delay);

            entries.insert(
                key_str,
                Entry {
                    record,
                    generation,
                    timer_id,
                    handle,
                    waiters: vec![tx],
                },
            );
        }

        Ok(WriteTicket::pending(rx))
    }

    fn next_generation(&self) -> u64 {
        self.inner.generations.fetch_add(1, Ordering::Relaxed)
    }

    fn arm_timer(&self, key: String, generation: u64, delay: Duration) -> JoinHandle<()> {
        let scheduler = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.fire(key, generation).await;
        })
    }

    /// Timer expiry: snapshot the cycle and flush it.
    async fn fire(&self, key: String, generation: u64) {
        // Cache record and timer bookkeeping leave together, under one
        // lock acquisition; a write landing after this block finds the key
        // IDLE and starts a fresh cycle.
        let entry = {
            let mut entries = self.inner.entries.lock().await;
            match entries.get(&key) {
                Some(entry) if entry.generation == generation => {}
                // Superseded by a newer write; that write re-armed the
                // timer and this task must not flush.
                _ => return,
            }
            let Some(entry) = entries.remove(&key) else {
                return;
            };
            self.inner.registry.deregister(entry.timer_id);
            if let Err(e) = self.inner.buffer.delete(&key).await {
                tracing::warn!("Failed to clear buffered record for {}: {}", key, e);
            }
            entry
        };

        let outcome = self.flush(&key, entry.record).await;
        for waiter in entry.waiters {
            // A caller that dropped its ticket is not an error.
            let _ = waiter.send(outcome.clone());
        }
    }

    /// Performs the backend write for a fired cycle. Exactly one `put`,
    /// no retries; a failure ends the cycle and surfaces to every waiter.
    async fn flush(&self, key: &str, record: PendingRecord) -> WriteOutcome {
        let doc_key = DocKey::parse(key)?;

        match self
            .inner
            .backend
            .put(
                doc_key.collection(),
                doc_key.id(),
                record.document,
                record.merge_on_flush,
            )
            .await
        {
            Ok(stored) => {
                tracing::debug!("Flushed buffered write for {}", key);
                Ok(stored)
            }
            Err(e) => {
                tracing::warn!("Flush failed for {}: {}", key, e);
                Err(e)
            }
        }
    }
}
