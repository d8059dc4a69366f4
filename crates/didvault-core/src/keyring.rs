use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{codec::CodecError, store::StoreError};

/// Public/private halves of one key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyPair {
    pub public: String,
    /// Sensitive: encrypted at rest.
    pub private: String,
}

/// Secret material for one decentralized identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyringRecord {
    pub did: String,
    /// Sensitive: encrypted at rest.
    pub seed: String,
    /// Sensitive when present. A missing key and an explicit `null` both read as `None`.
    #[serde(default)]
    pub mnemonic: Option<String>,
    pub sign: KeyPair,
    pub update: KeyPair,
    pub recovery: KeyPair,
    pub encrypt: KeyPair,
}

impl KeyringRecord {
    /// Every sensitive slot, labelled for error reporting. `mnemonic` only when present.
    pub(crate) fn sensitive_fields_mut(&mut self) -> Vec<(&'static str, &mut String)> {
        let mut fields = vec![
            ("sign.private", &mut self.sign.private),
            ("update.private", &mut self.update.private),
            ("recovery.private", &mut self.recovery.private),
            ("encrypt.private", &mut self.encrypt.private),
            ("seed", &mut self.seed),
        ];
        if let Some(mnemonic) = self.mnemonic.as_mut() {
            fields.push(("mnemonic", mnemonic));
        }
        fields
    }
}

/// A payload merged with its storage-assigned identifier.
///
/// Serialises flat (`{"_id": ..., ...payload}`); the identifier lives in its own field so
/// the payload can never overwrite it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identified<T> {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(flatten)]
    pub record: T,
}

impl<T> Identified<T> {
    pub fn new(id: impl Into<String>, record: T) -> Self {
        Self {
            id: id.into(),
            record,
        }
    }
}

/// Errors surfaced by keyring repositories.
#[derive(Debug, Error)]
pub enum KeyringError {
    /// Update target does not exist or the identifier is malformed. Not transient.
    #[error("invalid data: no keyring record with id `{id}`")]
    InvalidData { id: String },
    /// Permanent capability gap, distinct from missing data.
    #[error("operation not implemented: {operation}")]
    NotImplemented { operation: &'static str },
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error(transparent)]
    Store(#[from] StoreError),
    /// A stored document that does not have the keyring record shape.
    #[error("malformed keyring document: {0}")]
    Serialization(#[from] serde_json::Error),
    /// The cipher succeeded in both directions but did not return the original record.
    #[error("self-check failed: record did not survive an encrypt/decrypt round trip")]
    SelfCheck,
}

/// Repository contract for keyring persistence.
#[async_trait]
pub trait KeyringRepository: Send + Sync {
    /// Encrypt and store a new record; returns the plaintext payload with its new id.
    async fn insert(&self, payload: KeyringRecord) -> Result<Identified<KeyringRecord>, KeyringError>;

    /// Replace the stored fields of an existing record (last write wins).
    async fn update(
        &self,
        id: &str,
        payload: KeyringRecord,
    ) -> Result<Identified<KeyringRecord>, KeyringError>;

    /// First record whose `did` matches exactly, decrypted.
    async fn find_by_did(&self, did: &str) -> Result<Option<Identified<KeyringRecord>>, KeyringError>;

    /// Always fails with [`KeyringError::NotImplemented`].
    async fn delete_by_id(&self, id: &str) -> Result<(), KeyringError>;
}
