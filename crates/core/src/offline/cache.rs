//! Keyed payload cache for offline reads
//!
//! Last write wins per key; entries live until removed or cleared. The whole
//! map is persisted after every mutation.

use std::collections::BTreeMap;
use std::sync::Arc;

use carebridge_domain::constants::SECTION_OFFLINE_DATA;
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use tracing::debug;

use super::store::DurableStore;

pub struct OfflineCache {
    entries: Mutex<BTreeMap<String, Value>>,
    store: Arc<DurableStore>,
}

impl OfflineCache {
    pub fn new(store: Arc<DurableStore>, entries: BTreeMap<String, Value>) -> Self {
        Self { entries: Mutex::new(entries), store }
    }

    /// Insert or replace a cached payload
    pub fn put(&self, key: impl Into<String>, value: Value) {
        let key = key.into();
        let mut entries = self.entries.lock();
        entries.insert(key.clone(), value);
        self.store.persist(SECTION_OFFLINE_DATA, &*entries);
        debug!(key = %key, cached_keys = entries.len(), "Stored offline data");
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.lock().get(key).cloned()
    }

    /// Remove a cached payload, returning it if present
    pub fn remove(&self, key: &str) -> Option<Value> {
        let mut entries = self.entries.lock();
        let removed = entries.remove(key);
        if removed.is_some() {
            self.store.persist(SECTION_OFFLINE_DATA, &*entries);
        }
        removed
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.lock().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Write the current map regardless of whether it changed
    pub fn flush(&self) -> bool {
        let entries = self.entries.lock();
        self.store.persist(SECTION_OFFLINE_DATA, &*entries)
    }

    /// Held during an atomic clear across cache, queue and last-sync state
    pub(crate) fn lock_entries(&self) -> MutexGuard<'_, BTreeMap<String, Value>> {
        self.entries.lock()
    }
}
