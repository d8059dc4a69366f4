use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use didvault_keyring::DATABASE_NAME;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

pub const DEFAULT_KEY_SERVICE: &str = "didvault";
pub const DEFAULT_KEY_ACCOUNT: &str = "data-key";

/// User-level configuration loaded from `~/.config/didvault/config.toml` (platform-specific).
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Override for the document store root.
    pub data_dir: Option<PathBuf>,
    /// Database holding the keyring collection.
    pub database: Option<String>,
    /// OS keyring entry holding the data key.
    pub keyring: Option<KeyringConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct KeyringConfig {
    pub service: Option<String>,
    pub account: Option<String>,
}

impl Config {
    /// Fully populated config written by `config init`.
    pub fn with_defaults(data_dir: PathBuf) -> Self {
        Self {
            data_dir: Some(data_dir),
            database: Some(DATABASE_NAME.to_string()),
            keyring: Some(KeyringConfig {
                service: Some(DEFAULT_KEY_SERVICE.to_string()),
                account: Some(DEFAULT_KEY_ACCOUNT.to_string()),
            }),
        }
    }

    pub fn database_name(&self) -> &str {
        self.database.as_deref().unwrap_or(DATABASE_NAME)
    }

    pub fn key_service(&self) -> &str {
        self.keyring
            .as_ref()
            .and_then(|k| k.service.as_deref())
            .unwrap_or(DEFAULT_KEY_SERVICE)
    }

    pub fn key_account(&self) -> &str {
        self.keyring
            .as_ref()
            .and_then(|k| k.account.as_deref())
            .unwrap_or(DEFAULT_KEY_ACCOUNT)
    }
}

/// Load config from the default path; if missing, return defaults.
pub fn load() -> Result<Config> {
    let path = default_path()?;
    load_from_path(path)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("didvault").join("config.toml"))
}

/// Write `config` to `path` unless a file is already there; never clobbers user edits.
pub fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
