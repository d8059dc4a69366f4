use std::{path::PathBuf, sync::Arc};

use color_eyre::Result;
use didvault_keyring::{ConnectorContext, EncryptedKeyringRepo};
use didvault_storage::{
    aes_cipher::AesGcmCipher,
    json_file_store::JsonFileDocumentStore,
    key_provider::{KeyProvider, KeyringProvider},
};
use dirs::data_dir;
use tracing::debug;

use crate::config::Config;

pub type FileKeyringRepo = EncryptedKeyringRepo<JsonFileDocumentStore, AesGcmCipher>;

/// Resolve the default data directory for didvault.
pub fn default_data_dir() -> Result<PathBuf> {
    let base = data_dir().ok_or_else(|| color_eyre::eyre::eyre!("no data dir available"))?;
    Ok(base.join("didvault"))
}

fn store_root(config: &Config) -> Result<PathBuf> {
    match &config.data_dir {
        Some(root) => Ok(root.clone()),
        None => default_data_dir(),
    }
}

/// Build the keyring repository with the data key from the OS keychain.
pub async fn repo_from_config(config: &Config) -> Result<FileKeyringRepo> {
    let provider = KeyringProvider::new(config.key_service(), config.key_account());
    build_repo(config, &provider).await
}

pub async fn build_repo<P: KeyProvider>(config: &Config, provider: &P) -> Result<FileKeyringRepo> {
    let root = store_root(config)?;
    debug!(?root, database = config.database_name(), "opening keyring store");

    let key = provider.get_or_create().await?;
    debug!(key_id = %key.id, "data key loaded");

    let repo = EncryptedKeyringRepo::new(ConnectorContext {
        store: Arc::new(JsonFileDocumentStore::new(root)),
        cipher: AesGcmCipher::new(),
        secret: key.secret(),
    });
    Ok(repo.with_database(config.database_name()))
}
