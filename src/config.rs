//! Configuration management for AgriChain

use crate::blockchain::{DigestPolicy, DEFAULT_STORAGE_KEY};
use crate::error::ChainError;
use crate::export::{CsvMode, DEFAULT_CURRENCY};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "agrichain.toml";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub ledger: LedgerConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    #[default]
    Sqlite,
    File,
    Memory,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    #[serde(default = "default_storage_path")]
    pub path: String,
    #[serde(default = "default_storage_key")]
    pub key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            path: default_storage_path(),
            key: default_storage_key(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub digest: DigestPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub csv: CsvMode,
    #[serde(default = "default_currency")]
    pub currency: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            csv: CsvMode::default(),
            currency: default_currency(),
        }
    }
}

fn default_storage_path() -> String {
    "./data/agrichain.db".to_string()
}

fn default_storage_key() -> String {
    DEFAULT_STORAGE_KEY.to_string()
}

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

impl Config {
    pub fn from_toml(config_str: &str) -> Result<Self, ChainError> {
        let config: Config = toml::from_str(config_str)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ChainError> {
        if self.storage.backend != StorageBackend::Memory && self.storage.path.trim().is_empty() {
            return Err(ChainError::ConfigError(
                "storage.path must be set for the sqlite and file backends".to_string(),
            ));
        }
        if self.storage.key.trim().is_empty() {
            return Err(ChainError::ConfigError("storage.key must not be empty".to_string()));
        }
        Ok(())
    }
}

/// Per-user configuration file, `~/.agrichain/agrichain.toml`.
pub fn user_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".agrichain")
        .join(DEFAULT_CONFIG_FILE)
}

/// Load `agrichain.toml` from the working directory, then the per-user file,
/// falling back to defaults when neither exists.
pub fn load_config() -> Result<Config, ChainError> {
    let local = Path::new(DEFAULT_CONFIG_FILE);
    if local.exists() {
        return load_config_from(local);
    }
    let user = user_config_path();
    if user.exists() {
        return load_config_from(&user);
    }
    log::debug!("no configuration file found, using defaults");
    Ok(Config::default())
}

/// Load an explicitly named file. A missing file is an error.
pub fn load_config_from(path: &Path) -> Result<Config, ChainError> {
    if !path.exists() {
        return Err(ChainError::ConfigError(format!(
            "Config file {} does not exist",
            path.display()
        )));
    }
    let config_str = fs::read_to_string(path)?;
    Config::from_toml(&config_str)
}
