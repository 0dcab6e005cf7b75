//! Documents and metadata stamping.
//!
//! A document is a flat JSON object. Every document written through the
//! store carries three metadata fields: its identity, its creation time,
//! and its last-modified time. Stamping is a pure transform over the
//! outgoing payload; it never reads the backend.

use chrono::Utc;
use serde_json::Value;

/// A document payload: field name to JSON value.
pub type Document = serde_json::Map<String, Value>;

/// Creation timestamp, RFC 3339. Set on creation and on full overwrite.
pub const FIELD_DATE_CREATED: &str = "_DATE_CREATED";

/// Last-modified timestamp, RFC 3339. Set on every write.
pub const FIELD_DATE_LAST_MODIFIED: &str = "_DATE_LAST_MODIFIED";

/// The document's resolved identity.
pub const FIELD_DOCUMENT_ID: &str = "_DOCUMENT_ID";

/// Stamps an outgoing document with identity and timestamps.
///
/// `_DATE_LAST_MODIFIED` and `_DOCUMENT_ID` are set on every call. With
/// `overwrite` the creation date is reset to now; otherwise a
/// `_DATE_CREATED` already present in the payload is preserved (callers
/// edit previously fetched documents, so the payload carries the existing
/// metadata). A merge-edit payload without `_DATE_CREATED` is left without
/// one, so the backend's field merge keeps the stored value.
pub fn stamp(mut document: Document, id: &str, overwrite: bool) -> Document {
    let now = Utc::now().to_rfc3339();

    document.insert(FIELD_DOCUMENT_ID.to_string(), Value::String(id.to_string()));
    document.insert(
        FIELD_DATE_LAST_MODIFIED.to_string(),
        Value::String(now.clone()),
    );
    if overwrite {
        document.insert(FIELD_DATE_CREATED.to_string(), Value::String(now));
    }

    document
}

/// Shallow field merge: every field of `update` is written over `base`,
/// update winning on conflict. Nested objects are replaced, not merged.
pub fn merge_fields(mut base: Document, update: Document) -> Document {
    for (field, value) in update {
        base.insert(field, value);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(pairs: &[(&str, Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn test_stamp_overwrite_sets_equal_timestamps() {
        let stamped = stamp(doc(&[("title", json!("hello"))]), "abc", true);

        assert_eq!(stamped[FIELD_DOCUMENT_ID], json!("abc"));
        assert_eq!(
            stamped[FIELD_DATE_CREATED],
            stamped[FIELD_DATE_LAST_MODIFIED]
        );
    }

    #[test]
    fn test_stamp_preserves_caller_fields() {
        let stamped = stamp(doc(&[("title", json!("hello"))]), "abc", true);
        assert_eq!(stamped["title"], json!("hello"));
    }

    #[test]
    fn test_stamp_edit_preserves_created_date() {
        let original = "2020-01-01T00:00:00+00:00";
        let stamped = stamp(
            doc(&[("title", json!("x")), (FIELD_DATE_CREATED, json!(original))]),
            "abc",
            false,
        );

        assert_eq!(stamped[FIELD_DATE_CREATED], json!(original));
        assert_ne!(stamped[FIELD_DATE_LAST_MODIFIED], json!(original));
    }

    #[test]
    fn test_stamp_overwrite_resets_created_date() {
        let original = "2020-01-01T00:00:00+00:00";
        let stamped = stamp(
            doc(&[(FIELD_DATE_CREATED, json!(original))]),
            "abc",
            true,
        );

        assert_ne!(stamped[FIELD_DATE_CREATED], json!(original));
    }

    #[test]
    fn test_stamp_edit_without_created_date_leaves_it_absent() {
        let stamped = stamp(doc(&[("title", json!("x"))]), "abc", false);
        assert!(!stamped.contains_key(FIELD_DATE_CREATED));
        assert!(stamped.contains_key(FIELD_DATE_LAST_MODIFIED));
    }

    #[test]
    fn test_merge_update_wins_on_conflict() {
        let base = doc(&[("a", json!(1)), ("b", json!(2))]);
        let update = doc(&[("b", json!(20)), ("c", json!(3))]);

        let merged = merge_fields(base, update);
        assert_eq!(merged["a"], json!(1));
        assert_eq!(merged["b"], json!(20));
        assert_eq!(merged["c"], json!(3));
    }

    #[test]
    fn test_merge_replaces_nested_objects() {
        let base = doc(&[("meta", json!({"x": 1, "y": 2}))]);
        let update = doc(&[("meta", json!({"x": 10}))]);

        let merged = merge_fields(base, update);
        assert_eq!(merged["meta"], json!({"x": 10}));
    }
}
