//! Shutdown interception.
//!
//! A process with buffered writes still waiting on their debounce timers
//! must not exit: the writes would be lost. The guard reads the timer
//! registry (never mutating it) and either vetoes termination with a
//! human-readable warning or lets it proceed.

use std::time::Duration;

use crate::registry::TimerRegistry;

/// Raised when termination is requested while unflushed writes remain.
#[derive(Debug, Clone)]
pub struct PendingShutdown {
    /// Document keys with writes still waiting to flush.
    pub keys: Vec<String>,
}

impl std::fmt::Display for PendingShutdown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} unflushed write(s) still pending for: {}",
            self.keys.len(),
            self.keys.join(", ")
        )
    }
}

impl std::error::Error for PendingShutdown {}

/// Blocks process termination while unflushed writes remain.
#[derive(Clone)]
pub struct ShutdownGuard {
    registry: TimerRegistry,
}

impl ShutdownGuard {
    /// Creates a guard over the given registry. Registered once at
    /// startup; clones share the same registry.
    pub fn new(registry: TimerRegistry) -> Self {
        Self { registry }
    }

    /// Allows termination when no writes are pending, otherwise vetoes
    /// with the pending keys.
    pub fn check(&self) -> Result<(), PendingShutdown> {
        let keys = self.registry.pending_keys();
        if keys.is_empty() {
            Ok(())
        } else {
            Err(PendingShutdown { keys })
        }
    }

    /// Waits until every pending write has flushed.
    pub async fn wait_idle(&self) {
        self.registry.idle().await;
    }

    /// Waits for the pending writes to drain, giving up after `limit`.
    pub async fn wait_idle_timeout(&self, limit: Duration) -> Result<(), PendingShutdown> {
        match tokio::time::timeout(limit, self.registry.idle()).await {
            Ok(()) => Ok(()),
            Err(_) => {
                let pending = PendingShutdown {
                    keys: self.registry.pending_keys(),
                };
                tracing::warn!("Shutdown timed out: {}", pending);
                Err(pending)
            }
        }
    }
}
