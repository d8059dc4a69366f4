use std::fmt;

use async_trait::async_trait;
use thiserror::Error;

/// Opaque secret handed to the cipher on every call (never log its bytes).
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(Vec<u8>);

impl Secret {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn expose(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Errors produced by cipher implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CipherError {
    /// The secret cannot be used as a key by this cipher.
    #[error("invalid secret: {reason}")]
    InvalidSecret { reason: String },
    #[error("encrypt failed: {reason}")]
    Encrypt { reason: String },
    /// Wrong secret, tampered or truncated ciphertext.
    #[error("decrypt failed: {reason}")]
    Decrypt { reason: String },
}

/// Encrypt/decrypt capability injected into the keyring repository.
///
/// Implementations may suspend (e.g. to reach a key-management service); callers
/// await them and propagate failures unchanged.
#[async_trait]
pub trait Cipher: Send + Sync {
    async fn encrypt(&self, plaintext: &[u8], secret: &Secret) -> Result<Vec<u8>, CipherError>;

    async fn decrypt(&self, ciphertext: &[u8], secret: &Secret) -> Result<Vec<u8>, CipherError>;
}
