//! SQLite storage backend
//!
//! Sections are rows of a single key-value table. An upsert replaces the
//! whole section in one statement.

use std::path::{Path, PathBuf};
use std::time::Duration;

use carebridge_core::{StorageBackend, StorageError};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info, instrument};

use crate::errors::InfraError;

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS offline_sections (
    key         TEXT PRIMARY KEY NOT NULL,
    value       TEXT NOT NULL,
    updated_at  INTEGER NOT NULL
);
";

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Offline sections stored in a `rusqlite` key-value table
pub struct SqliteStorage {
    conn: Mutex<Connection>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStorage").field("path", &self.path).finish_non_exhaustive()
    }
}

fn unavailable(err: rusqlite::Error) -> StorageError {
    StorageError::from(InfraError::from(err))
}

fn write_failed(key: &str, err: rusqlite::Error) -> StorageError {
    StorageError::WriteFailed { key: key.to_string(), message: InfraError::from(err).to_string() }
}

impl SqliteStorage {
    /// Open the database file, creating it and its schema when missing
    ///
    /// # Errors
    /// Returns [`StorageError::Unavailable`] if the file cannot be opened or
    /// the schema cannot be created.
    #[instrument(skip_all, fields(db_path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| StorageError::from(InfraError::from(err)))?;
        }

        let conn = Connection::open(&path).map_err(unavailable)?;
        let storage = Self::with_connection(conn, Some(path))?;
        info!("sqlite storage initialised");
        Ok(storage)
    }

    /// Private in-memory database, gone when the storage is dropped
    ///
    /// # Errors
    /// Returns [`StorageError::Unavailable`] if the schema cannot be created.
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory().map_err(unavailable)?;
        Self::with_connection(conn, None)
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, StorageError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(unavailable)?;
        conn.execute_batch(SCHEMA_SQL).map_err(unavailable)?;
        Ok(Self { conn: Mutex::new(conn), path })
    }

    /// Database file path, `None` for in-memory storage
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Milliseconds since the epoch of the last write to `key`
    ///
    /// # Errors
    /// Returns [`StorageError::Unavailable`] when the query fails.
    pub fn updated_at(&self, key: &str) -> Result<Option<i64>, StorageError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT updated_at FROM offline_sections WHERE key = ?1",
            params![key],
            |row| row.get::<_, i64>(0),
        )
        .optional()
        .map_err(unavailable)
    }

    /// Keys of every stored section, sorted
    ///
    /// # Errors
    /// Returns [`StorageError::Unavailable`] when the query fails.
    pub fn section_keys(&self) -> Result<Vec<String>, StorageError> {
        let conn = self.conn.lock();
        let mut stmt =
            conn.prepare("SELECT key FROM offline_sections ORDER BY key").map_err(unavailable)?;
        let keys = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(unavailable)?
            .collect::<Result<Vec<_>, _>>()
            .map_err(unavailable)?;
        Ok(keys)
    }
}

impl StorageBackend for SqliteStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let conn = self.conn.lock();
        conn.query_row("SELECT value FROM offline_sections WHERE key = ?1", params![key], |row| {
            row.get::<_, String>(0)
        })
        .optional()
        .map_err(unavailable)
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let now = chrono::Utc::now().timestamp_millis();
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO offline_sections (key, value, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE
             SET value = excluded.value, updated_at = excluded.updated_at",
            params![key, value, now],
        )
        .map_err(|err| write_failed(key, err))?;
        debug!(key, bytes = value.len(), "section upserted");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM offline_sections WHERE key = ?1", params![key])
            .map_err(|err| write_failed(key, err))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn upsert_replaces_section() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        storage.write("offlineData", r#"{"a":1}"#).unwrap();
        storage.write("offlineData", r#"{"a":2}"#).unwrap();

        assert_eq!(storage.read("offlineData").unwrap().as_deref(), Some(r#"{"a":2}"#));
        assert_eq!(storage.section_keys().unwrap(), vec!["offlineData".to_string()]);
    }

    #[test]
    fn missing_and_removed_sections_read_as_none() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        assert_eq!(storage.read("pendingActions").unwrap(), None);

        storage.write("pendingActions", "[]").unwrap();
        storage.remove("pendingActions").unwrap();
        storage.remove("pendingActions").unwrap();
        assert_eq!(storage.read("pendingActions").unwrap(), None);
        assert_eq!(storage.updated_at("pendingActions").unwrap(), None);
    }

    #[test]
    fn records_update_time() {
        let storage = SqliteStorage::open_in_memory().unwrap();
        let before = chrono::Utc::now().timestamp_millis();
        storage.write("lastSyncTimestamp", "1700000000000").unwrap();

        let updated = storage.updated_at("lastSyncTimestamp").unwrap().unwrap();
        assert!(updated >= before);
    }

    #[test]
    fn sections_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("offline.sqlite3");

        {
            let storage = SqliteStorage::open(&path).unwrap();
            storage.write("deadLetterActions", "[]").unwrap();
            assert_eq!(storage.path(), Some(path.as_path()));
        }

        let reopened = SqliteStorage::open(&path).unwrap();
        assert_eq!(reopened.read("deadLetterActions").unwrap().as_deref(), Some("[]"));
    }

    #[test]
    fn garbage_file_is_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("not-a-db.sqlite3");
        std::fs::write(&path, vec![0x42_u8; 4096]).unwrap();

        let err = SqliteStorage::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
    }
}
