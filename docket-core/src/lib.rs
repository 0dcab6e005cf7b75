//! Docket Core Library
//!
//! Document-store access with write coalescing: a thin client over a
//! pluggable document backend, plus a debounce layer that buffers rapid
//! edits locally and flushes them as a single backend write after a quiet
//! period. A shutdown guard keeps the process alive while buffered writes
//! are still waiting to flush.

pub mod backend;
pub mod buffer;
pub mod debounce;
pub mod document;
pub mod error;
pub mod fs;
pub mod key;
pub mod memory;
pub mod registry;
pub mod shutdown;
pub mod store;

pub use backend::{DocumentBackend, DocumentWatcher, WatchEvent};
pub use buffer::{BufferStore, FileBufferStore, MemoryBufferStore, PendingRecord};
pub use debounce::{DebounceConfig, WriteOutcome, WriteScheduler, WriteTicket};
pub use document::{
    merge_fields, stamp, Document, FIELD_DATE_CREATED, FIELD_DATE_LAST_MODIFIED, FIELD_DOCUMENT_ID,
};
pub use error::StoreError;
pub use fs::FileBackend;
pub use key::{generate_document_id, DocKey};
pub use memory::MemoryBackend;
pub use registry::{TimerId, TimerRegistry};
pub use shutdown::{PendingShutdown, ShutdownGuard};
pub use store::Store;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
