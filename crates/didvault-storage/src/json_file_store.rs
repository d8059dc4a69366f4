use std::{
    fs::{self, File},
    io::{Read, Write},
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use didvault_core::{
    id::DocumentId,
    store::{apply_set, strip_id, Body, Document, DocumentStore, Namespace, StoreError},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;
use tracing::{debug, instrument};

/// Document store keeping one JSON file per collection under
/// `<root>/<database>/<collection>.json`. Every write replaces the file atomically.
pub struct JsonFileDocumentStore {
    root: PathBuf,
    // Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoredCollection {
    documents: Vec<StoredDocument>,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredDocument {
    #[serde(rename = "_id")]
    id: DocumentId,
    #[serde(flatten)]
    body: Body,
}

impl From<StoredDocument> for Document {
    fn from(stored: StoredDocument) -> Self {
        Document {
            id: stored.id,
            body: stored.body,
        }
    }
}

impl JsonFileDocumentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            lock: Mutex::new(()),
        }
    }

    fn path_for(&self, ns: &Namespace) -> PathBuf {
        self.root
            .join(sanitize(&ns.database))
            .join(format!("{}.json", sanitize(&ns.collection)))
    }

    fn guard(&self) -> Result<MutexGuard<'_, ()>, StoreError> {
        self.lock.lock().map_err(|err| StoreError::Storage {
            reason: format!("lock poisoned: {err}"),
        })
    }

    fn load(&self, ns: &Namespace) -> Result<StoredCollection, StoreError> {
        read_collection(&self.path_for(ns)).map_err(|err| match err {
            ReadError::Io(err) => storage_err(err),
            ReadError::Parse(err) => StoreError::Corrupt {
                namespace: ns.to_string(),
                reason: err.to_string(),
            },
        })
    }

    fn save(&self, ns: &Namespace, collection: &StoredCollection) -> Result<(), StoreError> {
        write_collection(&self.path_for(ns), collection)
    }
}

#[async_trait]
impl DocumentStore for JsonFileDocumentStore {
    #[instrument(skip_all, fields(ns = %ns))]
    async fn insert_one(&self, ns: &Namespace, body: Body) -> Result<DocumentId, StoreError> {
        let _guard = self.guard()?;
        let mut collection = self.load(ns)?;
        let id = DocumentId::generate();
        collection.documents.push(StoredDocument {
            id,
            body: strip_id(body),
        });
        self.save(ns, &collection)?;
        debug!(%id, "document inserted");
        Ok(id)
    }

    #[instrument(skip_all, fields(ns = %ns, id = %id))]
    async fn find_by_id(
        &self,
        ns: &Namespace,
        id: &DocumentId,
    ) -> Result<Option<Document>, StoreError> {
        let _guard = self.guard()?;
        let collection = self.load(ns)?;
        Ok(collection
            .documents
            .into_iter()
            .find(|doc| doc.id == *id)
            .map(Document::from))
    }

    #[instrument(skip_all, fields(ns = %ns, field = field))]
    async fn find_one(
        &self,
        ns: &Namespace,
        field: &str,
        value: &Value,
    ) -> Result<Option<Document>, StoreError> {
        let _guard = self.guard()?;
        let collection = self.load(ns)?;
        Ok(collection
            .documents
            .into_iter()
            .map(Document::from)
            .find(|doc| doc.matches(field, value)))
    }

    #[instrument(skip_all, fields(ns = %ns, id = %id))]
    async fn update_one(
        &self,
        ns: &Namespace,
        id: &DocumentId,
        set: Body,
    ) -> Result<bool, StoreError> {
        let _guard = self.guard()?;
        let mut collection = self.load(ns)?;
        let Some(doc) = collection.documents.iter_mut().find(|doc| doc.id == *id) else {
            return Ok(false);
        };
        apply_set(&mut doc.body, set);
        self.save(ns, &collection)?;
        Ok(true)
    }
}

enum ReadError {
    Io(std::io::Error),
    Parse(serde_json::Error),
}

fn read_collection(path: &Path) -> Result<StoredCollection, ReadError> {
    let mut file = match File::open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Ok(StoredCollection::default())
        }
        Err(err) => return Err(ReadError::Io(err)),
    };

    let mut buf = Vec::new();
    file.read_to_end(&mut buf).map_err(ReadError::Io)?;
    serde_json::from_slice(&buf).map_err(ReadError::Parse)
}

fn write_collection(path: &Path, collection: &StoredCollection) -> Result<(), StoreError> {
    let parent = path.parent().ok_or_else(|| StoreError::Storage {
        reason: "invalid storage path".to_string(),
    })?;
    fs::create_dir_all(parent).map_err(storage_err)?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(storage_err)?;
    let json = serde_json::to_vec_pretty(collection).map_err(storage_err)?;
    tmp.write_all(&json).map_err(storage_err)?;
    tmp.flush().map_err(storage_err)?;
    tmp.persist(path).map_err(|e| storage_err(e.error))?;
    Ok(())
}

fn sanitize(name: &str) -> String {
    URL_SAFE_NO_PAD.encode(name)
}

fn storage_err<E: ToString>(err: E) -> StoreError {
    StoreError::Storage {
        reason: err.to_string(),
    }
}
