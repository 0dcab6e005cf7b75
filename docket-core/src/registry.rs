//! Armed-timer bookkeeping.
//!
//! Every armed debounce timer is registered here, process-wide, so the
//! shutdown guard can answer "are there unflushed writes" without touching
//! scheduler internals. An id is added when its timer is armed and removed
//! when the timer fires or is replaced.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Identifies one armed timer.
pub type TimerId = u64;

/// Shared registry of armed timers across all document keys.
#[derive(Clone, Default)]
pub struct TimerRegistry {
    inner: Arc<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    armed: Mutex<HashMap<TimerId, String>>,
    next_id: AtomicU64,
    drained: Notify,
}

impl TimerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an armed timer for a document key, returning its id.
    pub fn register(&self, key: &str) -> TimerId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .armed
            .lock()
            .expect("timer registry lock poisoned")
            .insert(id, key.to_string());
        id
    }

    /// Removes a timer, waking `idle()` waiters when the registry drains.
    pub fn deregister(&self, id: TimerId) {
        let empty = {
            let mut armed = self
                .inner
                .armed
                .lock()
                .expect("timer registry lock poisoned");
            armed.remove(&id);
            armed.is_empty()
        };
        if empty {
            self.inner.drained.notify_waiters();
        }
    }

    /// True when no timers are armed.
    pub fn is_idle(&self) -> bool {
        self.inner
            .armed
            .lock()
            .expect("timer registry lock poisoned")
            .is_empty()
    }

    /// Number of armed timers.
    pub fn pending_count(&self) -> usize {
        self.inner
            .armed
            .lock()
            .expect("timer registry lock poisoned")
            .len()
    }

    /// Document keys with armed timers, sorted for stable output.
    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .inner
            .armed
            .lock()
            .expect("timer registry lock poisoned")
            .values()
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    /// Resolves once no timers are armed.
    pub async fn idle(&self) {
        loop {
            // Register for the wakeup before checking, so a deregister
            // racing this call is never missed.
            let drained = self.inner.drained.notified();
            if self.is_idle() {
                return;
            }
            drained.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_starts_idle() {
        let registry = TimerRegistry::new();
        assert!(registry.is_idle());
        assert_eq!(registry.pending_count(), 0);
    }

    #[test]
    fn test_register_and_deregister() {
        let registry = TimerRegistry::new();

        let a = registry.register("notes.a");
        let b = registry.register("notes.b");
        assert_eq!(registry.pending_count(), 2);
        assert!(!registry.is_idle());

        registry.deregister(a);
        assert_eq!(registry.pending_count(), 1);

        registry.deregister(b);
        assert!(registry.is_idle());
    }

    #[test]
    fn test_ids_are_unique() {
        let registry = TimerRegistry::new();
        let a = registry.register("notes.a");
        let b = registry.register("notes.a");
        assert_ne!(a, b);
    }

    #[test]
    fn test_pending_keys_sorted_and_deduped() {
        let registry = TimerRegistry::new();
        registry.register("todos.z");
        registry.register("notes.a");
        registry.register("notes.a");

        assert_eq!(registry.pending_keys(), vec!["notes.a", "todos.z"]);
    }

    #[test]
    fn test_deregister_unknown_id_is_harmless() {
        let registry = TimerRegistry::new();
        registry.deregister(42);
        assert!(registry.is_idle());
    }

    #[tokio::test]
    async fn test_idle_resolves_immediately_when_empty() {
        let registry = TimerRegistry::new();
        registry.idle().await;
    }

    #[tokio::test]
    async fn test_idle_waits_for_drain() {
        let registry = TimerRegistry::new();
        let id = registry.register("notes.a");

        let waiter = {
            let registry = registry.clone();
            tokio::spawn(async move { registry.idle().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        registry.deregister(id);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("idle() should resolve after drain")
            .unwrap();
    }
}
