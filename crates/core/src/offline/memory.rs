//! In-process storage backend
//!
//! Used when `storage.backend = "memory"` and by tests. Nothing survives the
//! process.

use std::collections::HashMap;

use parking_lot::RwLock;

use super::errors::StorageError;
use super::ports::StorageBackend;

#[derive(Debug, Default)]
pub struct MemoryStorage {
    sections: RwLock<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a raw section, e.g. a value persisted by an older release
    #[must_use]
    pub fn with_section(self, key: impl Into<String>, raw: impl Into<String>) -> Self {
        self.sections.write().insert(key.into(), raw.into());
        self
    }

    pub fn contains(&self, key: &str) -> bool {
        self.sections.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.sections.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.read().is_empty()
    }
}

impl StorageBackend for MemoryStorage {
    fn read(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.sections.read().get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.sections.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.sections.write().remove(key);
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
