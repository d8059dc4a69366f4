//! Concrete adapters behind the didvault core contracts: an AES-GCM cipher, key
//! providers (OS keyring in production, memory in tests) and a JSON-file document store.

pub mod aes_cipher;
pub mod json_file_store;
pub mod key_provider;
