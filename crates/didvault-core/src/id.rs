use std::{
    fmt,
    str::FromStr,
    sync::{
        atomic::{AtomicU32, Ordering},
        OnceLock,
    },
};

use chrono::Utc;
use hex::FromHexError;
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const ID_LEN: usize = 12;

/// Storage-assigned document key.
///
/// Twelve bytes: big-endian UNIX seconds, five bytes of per-process randomness and a
/// three-byte counter. Rendered as 24 lowercase hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId([u8; ID_LEN]);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdParseError {
    #[error("expected 24 hex characters, got {0}")]
    Length(usize),
    #[error("invalid hex character in identifier")]
    Hex,
}

impl DocumentId {
    /// Generate a fresh identifier. Only document stores should call this.
    pub fn generate() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        static PROCESS: OnceLock<[u8; 5]> = OnceLock::new();

        let process = PROCESS.get_or_init(|| {
            let mut bytes = [0u8; 5];
            OsRng.fill_bytes(&mut bytes);
            bytes
        });
        let seconds = Utc::now().timestamp() as u32;
        let count = COUNTER.fetch_add(1, Ordering::Relaxed);

        let mut bytes = [0u8; ID_LEN];
        bytes[..4].copy_from_slice(&seconds.to_be_bytes());
        bytes[4..9].copy_from_slice(process);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl FromStr for DocumentId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; ID_LEN];
        hex::decode_to_slice(s, &mut bytes).map_err(|err| match err {
            FromHexError::InvalidHexCharacter { .. } => IdParseError::Hex,
            FromHexError::InvalidStringLength | FromHexError::OddLength => {
                IdParseError::Length(s.len())
            }
        })?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for DocumentId {
    type Error = IdParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}
