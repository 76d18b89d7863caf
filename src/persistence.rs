//! Storage backends for AgriChain
//!
//! The ledger never touches a backend directly; it goes through the
//! [`Persistence`] port, which is a plain string key-value store.

use crate::error::{ChainError, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

const BACKUP_SUFFIX: &str = ".backup";

/// Abstraction for persistence backends. `write` must replace the whole
/// value atomically; `remove` on a missing key is not an error.
pub trait Persistence: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// SQLite-backed key-value store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create storage table: {}", e)))?;

        Ok(Database { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }
}

impl Persistence for Database {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT value FROM storage WHERE key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        )
        .optional()
        .map_err(|e| ChainError::DatabaseError(format!("Failed to read '{}': {}", key, e)))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT OR REPLACE INTO storage (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to write '{}': {}", key, e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let conn = self.lock()?;
        conn.execute("DELETE FROM storage WHERE key = ?1", params![key])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to remove '{}': {}", key, e)))?;
        Ok(())
    }
}

/// One JSON file per key inside a directory, written through a temp file and
/// renamed into place. The previous version is kept as `<key>.json.backup`.
pub struct FilePersistence {
    dir: PathBuf,
}

impl FilePersistence {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| {
            ChainError::StorageError(format!("Failed to create {}: {}", dir.display(), e))
        })?;
        Ok(FilePersistence { dir })
    }

    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(ChainError::StorageError(format!(
                "Storage key '{}' is not a valid file name",
                key
            )));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

impl Persistence for FilePersistence {
    fn read(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key)?;
        if !path.exists() {
            return Ok(None);
        }
        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| ChainError::StorageError(format!("Failed to read {}: {}", path.display(), e)))
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key)?;

        if path.exists() {
            let backup_path = path.with_extension(format!("json{}", BACKUP_SUFFIX));
            fs::copy(&path, &backup_path)
                .map_err(|e| ChainError::StorageError(format!("Failed to create backup: {}", e)))?;
        }

        let temp_path = path.with_extension("tmp");
        let mut file = File::create(&temp_path)
            .map_err(|e| ChainError::StorageError(format!("Failed to create temp file: {}", e)))?;
        file.write_all(value.as_bytes())
            .map_err(|e| ChainError::StorageError(format!("Failed to write ledger: {}", e)))?;
        file.sync_all()
            .map_err(|e| ChainError::StorageError(format!("Failed to sync file: {}", e)))?;
        drop(file);

        fs::rename(&temp_path, &path)
            .map_err(|e| ChainError::StorageError(format!("Failed to finalize write: {}", e)))?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ChainError::StorageError(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

/// Simple in-memory persistence implementation useful for tests and ephemeral runs.
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct InMemoryPersistence {
    pub entries: Arc<Mutex<HashMap<String, String>>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>> {
        self.entries
            .lock()
            .map_err(|_| ChainError::StorageError("Mutex poisoned".to_string()))
    }
}

impl Persistence for InMemoryPersistence {
    fn read(&self, key: &str) -> Result<Option<String>> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<()> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.lock()?.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn exercise(store: &dyn Persistence) {
        assert_eq!(store.read("agrichain").unwrap(), None);
        store.write("agrichain", "[1]").unwrap();
        store.write("agrichain", "[1,2]").unwrap();
        assert_eq!(store.read("agrichain").unwrap().as_deref(), Some("[1,2]"));
        store.remove("agrichain").unwrap();
        assert_eq!(store.read("agrichain").unwrap(), None);
        store.remove("agrichain").unwrap();
    }

    #[test]
    fn test_database_open() {
        let db = Database::open(":memory:").unwrap();
        assert!(db.conn.lock().unwrap().is_autocommit());
    }

    #[test]
    fn test_database_key_value() {
        let db = Database::open(":memory:").unwrap();
        exercise(&db);
    }

    #[test]
    fn test_database_survives_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ledger.db");
        let path = path.to_str().unwrap();

        Database::open(path).unwrap().write("agrichain", "[]").unwrap();
        let reopened = Database::open(path).unwrap();
        assert_eq!(reopened.read("agrichain").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn test_file_key_value() {
        let dir = TempDir::new().unwrap();
        let store = FilePersistence::open(dir.path().join("data")).unwrap();
        exercise(&store);
    }

    #[test]
    fn test_file_keeps_backup() {
        let dir = TempDir::new().unwrap();
        let store = FilePersistence::open(dir.path()).unwrap();
        store.write("agrichain", "first").unwrap();
        store.write("agrichain", "second").unwrap();

        let backup = dir.path().join("agrichain.json.backup");
        assert_eq!(fs::read_to_string(backup).unwrap(), "first");
        assert!(!dir.path().join("agrichain.tmp").exists());
    }

    #[test]
    fn test_file_rejects_path_like_keys() {
        let dir = TempDir::new().unwrap();
        let store = FilePersistence::open(dir.path()).unwrap();
        assert!(store.write("../escape", "x").is_err());
        assert!(store.read("").is_err());
    }

    #[test]
    fn test_in_memory_clones_share_state() {
        let store = InMemoryPersistence::new();
        let other = store.clone();
        exercise(&store);
        store.write("k", "v").unwrap();
        assert_eq!(other.read("k").unwrap().as_deref(), Some("v"));
    }
}
