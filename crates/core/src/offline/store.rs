//! Durable store: section-wise persistence of offline state
//!
//! The four sections (`offlineData`, `pendingActions`, `lastSyncTimestamp`,
//! `deadLetterActions`) are loaded and saved independently. A missing or
//! unreadable section falls back to its empty value without affecting the
//! others.

use std::collections::BTreeMap;
use std::sync::Arc;

use carebridge_common::error::ErrorClassification;
use carebridge_domain::constants::{
    ALL_SECTIONS, SECTION_DEAD_LETTERS, SECTION_LAST_SYNC, SECTION_OFFLINE_DATA,
    SECTION_PENDING_ACTIONS,
};
use carebridge_domain::OfflineSnapshot;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, error, instrument, warn};

use super::errors::StorageError;
use super::ports::StorageBackend;

/// Persistence facade over a [`StorageBackend`]
pub struct DurableStore {
    backend: Arc<dyn StorageBackend>,
}

impl DurableStore {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        Self { backend }
    }

    /// Load every section, defaulting any that are absent or corrupt
    ///
    /// Never fails: a read error or parse failure is logged and treated as
    /// "no prior state" for that section only.
    #[instrument(skip(self), fields(backend = self.backend.backend_name()))]
    pub fn load(&self) -> OfflineSnapshot {
        let snapshot = OfflineSnapshot {
            offline_data: self.load_section::<BTreeMap<String, Value>>(SECTION_OFFLINE_DATA),
            pending_actions: self.load_section(SECTION_PENDING_ACTIONS),
            last_sync_timestamp: self.load_section(SECTION_LAST_SYNC),
            dead_letter_actions: self.load_section(SECTION_DEAD_LETTERS),
        };

        debug!(
            cached_keys = snapshot.offline_data.len(),
            pending_actions = snapshot.pending_actions.len(),
            dead_letters = snapshot.dead_letter_actions.len(),
            last_sync = ?snapshot.last_sync_timestamp,
            "Loaded offline state"
        );

        snapshot
    }

    fn load_section<T: DeserializeOwned + Default>(&self, key: &str) -> T {
        match self.backend.read(key) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(value) => value,
                Err(err) => {
                    warn!(section = key, error = %err, "Discarding unreadable offline section");
                    T::default()
                }
            },
            Ok(None) => T::default(),
            Err(err) => {
                error!(
                    section = key,
                    error = %err,
                    retryable = err.is_retryable(),
                    "Failed to read offline section"
                );
                T::default()
            }
        }
    }

    /// Serialize and write one section
    ///
    /// # Errors
    /// Returns the serialization or backend error.
    pub fn save<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        self.backend.write(key, &raw)
    }

    /// Write one section, logging instead of propagating failures
    ///
    /// In-memory state stays authoritative for the session when the write
    /// fails. Returns whether the section was persisted.
    pub fn persist<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> bool {
        match self.save(key, value) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    section = key,
                    backend = self.backend.backend_name(),
                    error = %err,
                    "Failed to persist offline section"
                );
                false
            }
        }
    }

    /// Persist the last-sync section; `None` removes it
    pub fn persist_last_sync(&self, timestamp: Option<i64>) -> bool {
        match timestamp {
            Some(ts) => self.persist(SECTION_LAST_SYNC, &ts),
            None => self.remove_section(SECTION_LAST_SYNC),
        }
    }

    /// Remove every section. Returns false if any removal failed.
    pub fn clear_all(&self) -> bool {
        ALL_SECTIONS.iter().fold(true, |ok, key| self.remove_section(key) && ok)
    }

    fn remove_section(&self, key: &str) -> bool {
        match self.backend.remove(key) {
            Ok(()) => true,
            Err(err) => {
                error!(section = key, error = %err, "Failed to remove offline section");
                false
            }
        }
    }
}
