//! File-per-section storage backend
//!
//! Each section lives in `<root>/<key>.json`. Writes go to a sibling
//! `.json.tmp` file which is fsynced and then renamed over the target, so a
//! crash mid-write leaves the previous section intact.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use carebridge_common::error::CommonError;
use carebridge_core::{StorageBackend, StorageError};
use parking_lot::Mutex;
use tracing::{debug, instrument};

use crate::errors::InfraError;

const SECTION_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "json.tmp";

/// Stores every offline section as its own JSON file
#[derive(Debug)]
pub struct FileStorage {
    root: PathBuf,
    // Serializes writers so two saves of one section never share a temp file
    write_lock: Mutex<()>,
}

impl FileStorage {
    /// Open (and create if needed) the storage directory
    ///
    /// # Errors
    /// Returns [`StorageError::Unavailable`] when the directory cannot be
    /// created.
    #[instrument(skip_all, fields(root = %root.as_ref().display()))]
    pub fn open(root: impl AsRef<Path>) -> Result<Self, StorageError> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|err| StorageError::from(InfraError::from(err)))?;
        debug!("file storage opened");
        Ok(Self { root, write_lock: Mutex::new(()) })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn section_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        Ok(self.root.join(format!("{key}.{SECTION_EXTENSION}")))
    }
}

fn validate_key(key: &str) -> Result<(), StorageError> {
    let valid = !key.is_empty()
        && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CommonError::validation("key", format!("'{key}' is not a valid section key")).into())
    }
}

fn write_failed(key: &str, err: &io::Error) -> StorageError {
    StorageError::WriteFailed { key: key.to_string(), message: err.to_string() }
}

impl StorageBackend for FileStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.section_path(key)?;
        match fs::read_to_string(&path) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(StorageError::Unavailable(format!(
                "failed to read {}: {err}",
                path.display()
            ))),
        }
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.section_path(key)?;
        let temp_path = self.root.join(format!("{key}.{TEMP_EXTENSION}"));
        let _guard = self.write_lock.lock();

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|err| write_failed(key, &err))?;
        file.write_all(value.as_bytes()).map_err(|err| write_failed(key, &err))?;
        file.sync_all().map_err(|err| write_failed(key, &err))?;
        drop(file);

        fs::rename(&temp_path, &path).map_err(|err| write_failed(key, &err))?;
        debug!(key, bytes = value.len(), "section written");
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.section_path(key)?;
        let _guard = self.write_lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(write_failed(key, &err)),
        }
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
