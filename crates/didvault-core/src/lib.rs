//! Core abstractions for didvault: the keyring data model, storage and cipher
//! contracts, and the field-level codec that keeps private material encrypted at rest.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod cipher;
pub mod codec;
pub mod id;
pub mod keyring;
pub mod store;
