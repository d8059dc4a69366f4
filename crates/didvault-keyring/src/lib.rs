//! Keyring repository that keeps private key material encrypted at rest in any
//! [`DocumentStore`], using an injected [`Cipher`].

use std::sync::Arc;

use async_trait::async_trait;
use didvault_core::{
    cipher::{Cipher, Secret},
    codec::{decrypt_record, encrypt_record},
    id::DocumentId,
    keyring::{Identified, KeyPair, KeyringError, KeyringRecord, KeyringRepository},
    store::{Body, Document, DocumentStore, Namespace},
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

pub const DATABASE_NAME: &str = "node_wallet_sdk";
pub const COLLECTION_NAME: &str = "keyring";

/// Capabilities the repository is built from.
pub struct ConnectorContext<S, C> {
    pub store: Arc<S>,
    pub cipher: C,
    pub secret: Secret,
}

/// Keyring repository encrypting sensitive fields before every write and decrypting
/// them after every read.
pub struct EncryptedKeyringRepo<S: DocumentStore, C: Cipher> {
    store: Arc<S>,
    cipher: C,
    secret: Secret,
    namespace: Namespace,
}

impl<S: DocumentStore, C: Cipher> EncryptedKeyringRepo<S, C> {
    pub fn new(context: ConnectorContext<S, C>) -> Self {
        Self {
            store: context.store,
            cipher: context.cipher,
            secret: context.secret,
            namespace: Namespace::new(DATABASE_NAME, COLLECTION_NAME),
        }
    }

    /// Use another database; the collection name stays fixed.
    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.namespace.database = database.into();
        self
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Round-trip a canary record through the cipher and issue one read against the store.
    /// Writes nothing.
    #[instrument(skip_all, fields(ns = %self.namespace))]
    pub async fn verify(&self) -> Result<(), KeyringError> {
        let canary = KeyringRecord {
            did: CANARY_DID.to_string(),
            seed: "canary-seed".to_string(),
            mnemonic: Some("canary mnemonic".to_string()),
            sign: canary_pair(),
            update: canary_pair(),
            recovery: canary_pair(),
            encrypt: canary_pair(),
        };
        let sealed = encrypt_record(&canary, &self.cipher, &self.secret).await?;
        let opened = decrypt_record(&sealed, &self.cipher, &self.secret).await?;
        if opened != canary {
            warn!("cipher returned a different record than it was given");
            return Err(KeyringError::SelfCheck);
        }

        let filter = Value::String(CANARY_DID.to_string());
        self.store.find_one(&self.namespace, "did", &filter).await?;
        debug!("keyring store verified");
        Ok(())
    }

    async fn seal(&self, payload: &KeyringRecord) -> Result<Body, KeyringError> {
        let sealed = encrypt_record(payload, &self.cipher, &self.secret).await?;
        Ok(serde_json::from_value(serde_json::to_value(sealed)?)?)
    }

    async fn open(&self, doc: Document) -> Result<Identified<KeyringRecord>, KeyringError> {
        let stored: KeyringRecord = serde_json::from_value(Value::Object(doc.body))?;
        let record = decrypt_record(&stored, &self.cipher, &self.secret).await?;
        Ok(Identified::new(doc.id.to_string(), record))
    }
}

const CANARY_DID: &str = "did:didvault:health-canary";

fn canary_pair() -> KeyPair {
    KeyPair {
        public: "canary-public".to_string(),
        private: "canary-private".to_string(),
    }
}

#[async_trait]
impl<S: DocumentStore, C: Cipher> KeyringRepository for EncryptedKeyringRepo<S, C> {
    #[instrument(skip_all, fields(did = %payload.did))]
    async fn insert(&self, payload: KeyringRecord) -> Result<Identified<KeyringRecord>, KeyringError> {
        let body = self.seal(&payload).await?;
        let id = self.store.insert_one(&self.namespace, body).await?;
        info!(%id, "keyring record stored");
        Ok(Identified::new(id.to_string(), payload))
    }

    #[instrument(skip_all, fields(id = %id, did = %payload.did))]
    async fn update(
        &self,
        id: &str,
        payload: KeyringRecord,
    ) -> Result<Identified<KeyringRecord>, KeyringError> {
        let invalid = || KeyringError::InvalidData { id: id.to_string() };

        let doc_id = id.parse::<DocumentId>().map_err(|err| {
            warn!(%err, "rejecting malformed keyring id");
            invalid()
        })?;
        if self.store.find_by_id(&self.namespace, &doc_id).await?.is_none() {
            warn!("update target does not exist");
            return Err(invalid());
        }

        let body = self.seal(&payload).await?;
        if !self.store.update_one(&self.namespace, &doc_id, body).await? {
            return Err(invalid());
        }
        info!("keyring record updated");
        Ok(Identified::new(doc_id.to_string(), payload))
    }

    #[instrument(skip_all, fields(did = %did))]
    async fn find_by_did(&self, did: &str) -> Result<Option<Identified<KeyringRecord>>, KeyringError> {
        let filter = Value::String(did.to_string());
        match self.store.find_one(&self.namespace, "did", &filter).await? {
            Some(doc) => {
                debug!(id = %doc.id, "keyring record found");
                self.open(doc).await.map(Some)
            }
            None => {
                debug!("no keyring record for did");
                Ok(None)
            }
        }
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete_by_id(&self, id: &str) -> Result<(), KeyringError> {
        warn!("delete requested but not supported");
        Err(KeyringError::NotImplemented {
            operation: "delete_by_id",
        })
    }
}
