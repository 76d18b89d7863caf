//! Helpers shared by the command-line front end.

use crate::blockchain::Ledger;
use crate::config::{load_config, load_config_from, Config, StorageBackend};
use crate::error::ChainError;
use crate::persistence::{Database, FilePersistence, InMemoryPersistence, Persistence};
use std::fs;
use std::path::Path;

/// Build the storage backend selected in `config`.
pub fn open_persistence(config: &Config) -> Result<Box<dyn Persistence>, ChainError> {
    let path = config.storage.path.as_str();
    match config.storage.backend {
        StorageBackend::Sqlite => {
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent)?;
                }
            }
            Ok(Box::new(Database::open(path)?))
        }
        StorageBackend::File => Ok(Box::new(FilePersistence::open(path)?)),
        StorageBackend::Memory => Ok(Box::new(InMemoryPersistence::new())),
    }
}

/// Open the ledger described by `config`.
pub fn open_ledger(config: &Config) -> Result<Ledger, ChainError> {
    let persistence = open_persistence(config)?;
    let ledger = Ledger::load_with_key(persistence, config.ledger.digest, &config.storage.key)?;
    log::info!(
        "opened ledger '{}' with {} block(s), {:?} digest",
        ledger.storage_key(),
        ledger.len(),
        ledger.digest_policy()
    );
    Ok(ledger)
}

/// Load the configuration (explicit file or the default lookup) and open its ledger.
/// An explicit file that does not exist is an error.
pub fn load_ledger_from_config(config_path: Option<&Path>) -> Result<(Config, Ledger), ChainError> {
    let config = match config_path {
        Some(path) => load_config_from(path)?,
        None => load_config()?,
    };
    let ledger = open_ledger(&config)?;
    Ok((config, ledger))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{BlockFields, DigestPolicy};
    use tempfile::TempDir;

    fn config_for(backend: StorageBackend, path: String) -> Config {
        let mut config = Config::default();
        config.storage.backend = backend;
        config.storage.path = path;
        config
    }

    #[test]
    fn test_sqlite_ledger_reopens() {
        let dir = TempDir::new().unwrap();
        let db_path = dir.path().join("nested").join("agrichain.db");
        let config = config_for(StorageBackend::Sqlite, db_path.to_string_lossy().into_owned());

        let mut ledger = open_ledger(&config).unwrap();
        ledger.append(BlockFields::new("Ravi", "Wheat", "100", "20")).unwrap();
        drop(ledger);

        let reopened = open_ledger(&config).unwrap();
        assert_eq!(reopened.len(), 1);
        assert!(reopened.verify().valid);
    }

    #[test]
    fn test_file_ledger_reopens() {
        let dir = TempDir::new().unwrap();
        let config = config_for(StorageBackend::File, dir.path().to_string_lossy().into_owned());

        let mut ledger = open_ledger(&config).unwrap();
        ledger.append(BlockFields::new("Asha", "Rice", "5", "30")).unwrap();
        drop(ledger);

        assert!(dir.path().join("agrichain.json").exists());
        assert_eq!(open_ledger(&config).unwrap().len(), 1);
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = TempDir::new().unwrap();
        let config_path = dir.path().join("agrichain.toml");
        fs::write(&config_path, "[storage]\nbackend = \"memory\"\n").unwrap();

        let (config, ledger) = load_ledger_from_config(Some(&config_path)).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Memory);
        assert!(ledger.is_empty());
        assert_eq!(ledger.storage_key(), "agrichain");
        assert_eq!(ledger.digest_policy(), DigestPolicy::Sha256);
    }

    #[test]
    fn test_missing_explicit_config_is_rejected() {
        let dir = TempDir::new().unwrap();
        let result = load_ledger_from_config(Some(&dir.path().join("typo.toml")));
        assert!(matches!(result, Err(ChainError::ConfigError(_))));
    }
}
