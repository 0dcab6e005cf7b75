//! Error types for document store operations.

use thiserror::Error;

/// Errors that can occur during store operations.
///
/// `Clone` because one flush outcome is delivered to every caller whose
/// write was coalesced into that flush cycle.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    /// A required identifier is missing or malformed. Raised before any
    /// backend call.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The requested document does not exist.
    #[error("Document not found: {collection}.{id}")]
    NotFound { collection: String, id: String },

    /// The document backend failed.
    #[error("Backend error: {0}")]
    Backend(String),

    /// The pending-write buffer store failed.
    #[error("Buffer store error: {0}")]
    Buffer(String),
}

impl StoreError {
    /// Shorthand for a `NotFound` error.
    pub fn not_found(collection: &str, id: &str) -> Self {
        StoreError::NotFound {
            collection: collection.to_string(),
            id: id.to_string(),
        }
    }
}
