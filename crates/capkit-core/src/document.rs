//! Loosely-typed document helpers shared by every store backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A schemaless record as held by the document store.
pub type Document = serde_json::Map<String, Value>;

/// A document together with the id it is stored under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    pub data: Document,
}

impl StoredDocument {
    pub fn new(id: impl Into<String>, data: Document) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }
}

/// Presence test for a loosely-typed field.
///
/// `null`, `false`, the empty string and numeric zero count as absent.
/// Arrays and objects are present even when empty.
pub fn is_present(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Number(n)) => n.as_f64().map_or(true, |f| f != 0.0),
        Some(Value::Array(_)) | Some(Value::Object(_)) => true,
    }
}

/// Returns the field as text when it holds a non-empty string.
pub fn text_field<'a>(doc: &'a Document, key: &str) -> Option<&'a str> {
    match doc.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
        _ => None,
    }
}

/// Recursively merges `patch` into `target`. Nested objects are merged key by
/// key; every other value in the patch replaces the existing one.
pub fn merge_documents(target: &mut Document, patch: Document) {
    for (key, value) in patch {
        match (target.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(incoming)) => {
                merge_documents(existing, incoming);
            }
            (_, value) => {
                target.insert(key, value);
            }
        }
    }
}
