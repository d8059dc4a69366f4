use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::Value;
use tracing::instrument;

use super::{apply_set, strip_id, Body, Document, DocumentStore, Namespace, StoreError};
use crate::id::DocumentId;

/// In-memory document store for tests and smoke runs. Collections keep insertion order.
#[derive(Debug, Default, Clone)]
pub struct InMemoryDocumentStore {
    inner: Arc<Mutex<HashMap<Namespace, Vec<Document>>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw documents of a collection, as stored.
    pub fn documents(&self, ns: &Namespace) -> Result<Vec<Document>, StoreError> {
        Ok(self.lock()?.get(ns).cloned().unwrap_or_default())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Namespace, Vec<Document>>>, StoreError> {
        self.inner.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    #[instrument(skip_all, fields(ns = %ns))]
    async fn insert_one(&self, ns: &Namespace, body: Body) -> Result<DocumentId, StoreError> {
        let id = DocumentId::generate();
        self.lock()?.entry(ns.clone()).or_default().push(Document {
            id,
            body: strip_id(body),
        });
        Ok(id)
    }

    #[instrument(skip_all, fields(ns = %ns, id = %id))]
    async fn find_by_id(
        &self,
        ns: &Namespace,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()?
            .get(ns)
            .and_then(|docs| docs.iter().find(|doc| doc.id == *id))
            .cloned())
    }

    #[instrument(skip_all, fields(ns = %ns, field = field))]
    async fn find_one(
        &self,
        ns: &Namespace,
        field: &str,
        value: &Value,
    ) -> Result<Option<Document>, StoreError> {
        Ok(self
            .lock()?
            .get(ns)
            .and_then(|docs| docs.iter().find(|doc| doc.matches(field, value)))
            .cloned())
    }

    #[instrument(skip_all, fields(ns = %ns, id = %id))]
    async fn update_one(
        &self,
        ns: &Namespace,
        id: &DocumentId,
        set: Body,
    ) -> Result<bool, StoreError> {
        let mut guard = self.lock()?;
        let Some(doc) = guard
            .get_mut(ns)
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == *id))
        else {
            return Ok(false);
        };
        apply_set(&mut doc.body, set);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn ns() -> Namespace {
        Namespace::new("node_wallet_sdk", "keyring")
    }

    fn body(value: Value) -> Body {
        value.as_object().cloned().expect("object")
    }

    #[tokio::test]
    async fn insert_assigns_fresh_ids_and_ignores_caller_id() {
        let store = InMemoryDocumentStore::new();
        let first = store
            .insert_one(&ns(), body(json!({"_id": "forged", "did": "a"})))
            .await
            .expect("insert");
        let second = store
            .insert_one(&ns(), body(json!({"did": "b"})))
            .await
            .expect("insert");
        assert_ne!(first, second);

        let doc = store
            .find_by_id(&ns(), &first)
            .await
            .expect("find")
            .expect("present");
        assert_eq!(doc.body, body(json!({"did": "a"})));
    }

    #[tokio::test]
    async fn find_one_returns_first_match_in_insertion_order() {
        let store = InMemoryDocumentStore::new();
        let first = store
            .insert_one(&ns(), body(json!({"did": "dup", "n": 1})))
            .await
            .expect("insert");
        store
            .insert_one(&ns(), body(json!({"did": "dup", "n": 2})))
            .await
            .expect("insert");

        let found = store
            .find_one(&ns(), "did", &json!("dup"))
            .await
            .expect("find")
            .expect("present");
        assert_eq!(found.id, first);

        let miss = store
            .find_one(&ns(), "did", &json!("nope"))
            .await
            .expect("find");
        assert!(miss.is_none());
    }

    #[tokio::test]
    async fn collections_are_isolated() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_one(&ns(), body(json!({"did": "a"})))
            .await
            .expect("insert");
        let other = Namespace::new("node_wallet_sdk", "other");
        let found = store
            .find_one(&other, "did", &json!("a"))
            .await
            .expect("find");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn update_reports_whether_it_matched() {
        let store = InMemoryDocumentStore::new();
        let id = store
            .insert_one(&ns(), body(json!({"did": "a", "seed": "old"})))
            .await
            .expect("insert");

        let matched = store
            .update_one(&ns(), &id, body(json!({"seed": "new"})))
            .await
            .expect("update");
        assert!(matched);
        let doc = store.documents(&ns()).expect("documents");
        assert_eq!(doc[0].body, body(json!({"did": "a", "seed": "new"})));

        let missing = store
            .update_one(&ns(), &DocumentId::generate(), body(json!({"seed": "x"})))
            .await
            .expect("update");
        assert!(!missing);
        assert_eq!(store.documents(&ns()).expect("documents").len(), 1);
    }
}
