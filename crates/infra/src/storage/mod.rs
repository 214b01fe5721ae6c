//! Storage backend implementations
//!
//! [`open_backend`] picks the backend named in [`StorageConfig`]:
//! - `file`: one JSON file per section under `storage.path`
//! - `sqlite`: a single database file at `storage.path`
//! - `memory`: nothing survives the process

pub mod file;
pub mod sqlite;

use std::sync::Arc;

use carebridge_core::{MemoryStorage, StorageBackend, StorageError};
use carebridge_domain::{StorageBackendKind, StorageConfig};
use tracing::info;

pub use file::FileStorage;
pub use sqlite::SqliteStorage;

/// Open the configured storage backend
///
/// # Errors
/// Returns [`StorageError`] when the file or database backend cannot be
/// opened.
pub fn open_backend(config: &StorageConfig) -> Result<Arc<dyn StorageBackend>, StorageError> {
    let backend: Arc<dyn StorageBackend> = match config.backend {
        StorageBackendKind::File => Arc::new(FileStorage::open(&config.path)?),
        StorageBackendKind::Sqlite => Arc::new(SqliteStorage::open(&config.path)?),
        StorageBackendKind::Memory => Arc::new(MemoryStorage::new()),
    };
    info!(backend = backend.backend_name(), path = %config.path.display(), "storage backend ready");
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn opens_each_configured_backend() {
        let dir = TempDir::new().unwrap();

        let file = open_backend(&StorageConfig {
            backend: StorageBackendKind::File,
            path: dir.path().join("sections"),
        })
        .unwrap();
        assert_eq!(file.backend_name(), "file");

        let sqlite = open_backend(&StorageConfig {
            backend: StorageBackendKind::Sqlite,
            path: dir.path().join("offline.sqlite3"),
        })
        .unwrap();
        assert_eq!(sqlite.backend_name(), "sqlite");

        let memory = open_backend(&StorageConfig {
            backend: StorageBackendKind::Memory,
            path: dir.path().to_path_buf(),
        })
        .unwrap();
        memory.write("offlineData", "{}").unwrap();
        assert_eq!(memory.read("offlineData").unwrap().as_deref(), Some("{}"));
    }
}
