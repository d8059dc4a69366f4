use std::fmt;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::id::DocumentId;

mod memory;

pub use memory::InMemoryDocumentStore;

/// Key under which stores expose the document identifier.
pub const ID_FIELD: &str = "_id";

/// Document payload without its identifier.
pub type Body = Map<String, Value>;

/// Errors produced by document store implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
    /// Persisted data could not be read back.
    #[error("corrupt collection {namespace}: {reason}")]
    Corrupt { namespace: String, reason: String },
}

/// Database + collection pair addressing one set of documents.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub database: String,
    pub collection: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, collection: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            collection: collection.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.collection)
    }
}

/// A stored document: the store's own key plus the body it holds.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: DocumentId,
    pub body: Body,
}

impl Document {
    /// Whether `body[field] == value`; `_id` compares against the canonical identifier.
    pub fn matches(&self, field: &str, value: &Value) -> bool {
        if field == ID_FIELD {
            return value.as_str() == Some(self.id.to_string().as_str());
        }
        self.body.get(field) == Some(value)
    }
}

/// Minimal document-store contract consumed by the keyring repository.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Store `body` as a new document and return the identifier the store assigned.
    async fn insert_one(&self, ns: &Namespace, body: Body) -> Result<DocumentId, StoreError>;

    async fn find_by_id(
        &self,
        ns: &Namespace,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError>;

    /// First document, in insertion order, whose `field` equals `value` exactly.
    async fn find_one(
        &self,
        ns: &Namespace,
        field: &str,
        value: &Value,
    ) -> Result<Option<Document>, StoreError>;

    /// Overwrite the fields in `set` on the document with `id`. Returns whether it matched.
    async fn update_one(
        &self,
        ns: &Namespace,
        id: &DocumentId,
        set: Body,
    ) -> Result<bool, StoreError>;
}

/// Drop any caller-supplied identifier; only the store assigns `_id`.
pub fn strip_id(mut body: Body) -> Body {
    body.remove(ID_FIELD);
    body
}

/// Apply `$set` semantics: every key in `set` replaces the one in `body`.
pub fn apply_set(body: &mut Body, set: Body) {
    for (key, value) in strip_id(set) {
        body.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn body(value: Value) -> Body {
        value.as_object().cloned().expect("object")
    }

    #[test]
    fn strip_id_removes_caller_identifier() {
        let stripped = strip_id(body(json!({"_id": "mine", "did": "did:example:1"})));
        assert_eq!(stripped, body(json!({"did": "did:example:1"})));
    }

    #[test]
    fn apply_set_overwrites_and_keeps_other_fields() {
        let mut target = body(json!({"did": "a", "seed": "old", "extra": 1}));
        apply_set(&mut target, body(json!({"seed": "new", "_id": "ignored"})));
        assert_eq!(target, body(json!({"did": "a", "seed": "new", "extra": 1})));
    }

    #[test]
    fn matches_on_id_uses_canonical_form() {
        let doc = Document {
            id: "65a1b2c3d4e5f60718293a4b".parse().expect("id"),
            body: body(json!({"did": "did:example:1"})),
        };
        assert!(doc.matches("_id", &json!("65a1b2c3d4e5f60718293a4b")));
        assert!(doc.matches("did", &json!("did:example:1")));
        assert!(!doc.matches("did", &json!("DID:EXAMPLE:1")));
    }
}
