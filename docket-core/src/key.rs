//! Document keys.
//!
//! A document is addressed by a collection name and a document id. The pair
//! is rendered as `"{collection}.{id}"`, which is the key used by the
//! pending-write buffer and the timer registry. Collection names must not
//! contain `.` so the rendered key parses unambiguously.

use uuid::Uuid;

use crate::error::StoreError;

/// A validated (collection, id) pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocKey {
    collection: String,
    id: String,
}

impl DocKey {
    /// Creates a key, validating both parts.
    ///
    /// Fails fast with `InvalidArguments` so no backend call is attempted
    /// with a bad identifier.
    pub fn new(collection: &str, id: &str) -> Result<Self, StoreError> {
        validate_collection(collection)?;
        validate_id(id)?;
        Ok(Self {
            collection: collection.to_string(),
            id: id.to_string(),
        })
    }

    /// Parses a rendered key back into its parts.
    pub fn parse(key: &str) -> Result<Self, StoreError> {
        let (collection, id) = key.split_once('.').ok_or_else(|| {
            StoreError::InvalidArguments(format!("malformed document key: {}", key))
        })?;
        Self::new(collection, id)
    }

    /// The collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// The document id.
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl std::fmt::Display for DocKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.collection, self.id)
    }
}

/// Generates a new random document id (hyphenated v4 uuid).
pub fn generate_document_id() -> String {
    Uuid::new_v4().to_string()
}

/// Validates a collection name.
///
/// Collection names double as directory names in the filesystem backend,
/// so path separators and dot-prefixed names are rejected along with the
/// `.` key separator.
pub fn validate_collection(collection: &str) -> Result<(), StoreError> {
    if collection.is_empty() {
        return Err(StoreError::InvalidArguments(
            "collection name is empty".to_string(),
        ));
    }
    if collection.contains('.') || collection.contains('/') || collection.contains('\\') {
        return Err(StoreError::InvalidArguments(format!(
            "invalid collection name: {}",
            collection
        )));
    }
    Ok(())
}

fn validate_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() {
        return Err(StoreError::InvalidArguments(
            "document id is empty".to_string(),
        ));
    }
    if id.contains('/') || id.contains('\\') || id.contains("..") || id.starts_with('.') {
        return Err(StoreError::InvalidArguments(format!(
            "invalid document id: {}",
            id
        )));
    }
    Ok(())
}
