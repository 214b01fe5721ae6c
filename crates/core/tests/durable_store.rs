//! Integration tests for `DurableStore` section persistence.

use std::collections::BTreeMap;
use std::sync::Arc;

use carebridge_core::{DurableStore, MemoryStorage, StorageBackend};
use carebridge_domain::constants::{
    SECTION_DEAD_LETTERS, SECTION_LAST_SYNC, SECTION_OFFLINE_DATA, SECTION_PENDING_ACTIONS,
};
use carebridge_domain::{OfflineSnapshot, PendingAction};
use serde_json::json;

const SECTIONS: [&str; 4] =
    [SECTION_OFFLINE_DATA, SECTION_PENDING_ACTIONS, SECTION_LAST_SYNC, SECTION_DEAD_LETTERS];

fn sample_snapshot() -> OfflineSnapshot {
    let mut offline_data = BTreeMap::new();
    offline_data.insert("patients".to_string(), json!([{"id": "p-1", "name": "Ana"}]));
    offline_data.insert("pipeline".to_string(), json!({"stages": ["lead", "won"]}));

    let mut retried = PendingAction::new("sendEmail", json!({"to": "a@b.c"}), 20);
    retried.retry_count = 2;

    OfflineSnapshot {
        offline_data,
        pending_actions: vec![
            PendingAction::new("createContact", json!({"name": "Jane"}), 10),
            retried,
        ],
        last_sync_timestamp: Some(1_700_000_000_123),
        dead_letter_actions: vec![PendingAction::new("createDeal", json!(null), 5)],
    }
}

fn save_all(store: &DurableStore, snapshot: &OfflineSnapshot) {
    store.save(SECTION_OFFLINE_DATA, &snapshot.offline_data).unwrap();
    store.save(SECTION_PENDING_ACTIONS, &snapshot.pending_actions).unwrap();
    store.save(SECTION_LAST_SYNC, &snapshot.last_sync_timestamp).unwrap();
    store.save(SECTION_DEAD_LETTERS, &snapshot.dead_letter_actions).unwrap();
}

/// Validates `DurableStore::load` behavior for the load-after-save scenario.
///
/// Assertions:
/// - Confirms the loaded snapshot equals the saved one.
/// - Confirms re-saving the loaded snapshot writes identical bytes.
#[test]
fn load_after_save_reproduces_every_section() {
    let backend = Arc::new(MemoryStorage::new());
    let store = DurableStore::new(backend.clone());
    let snapshot = sample_snapshot();

    save_all(&store, &snapshot);
    let before: Vec<_> = SECTIONS.iter().map(|key| backend.read(key).unwrap()).collect();

    let loaded = store.load();
    assert_eq!(loaded, snapshot);

    save_all(&store, &loaded);
    let after: Vec<_> = SECTIONS.iter().map(|key| backend.read(key).unwrap()).collect();
    assert_eq!(before, after);
}

#[test]
fn each_corrupt_section_is_isolated() {
    let snapshot = sample_snapshot();

    for corrupt in SECTIONS {
        let backend = Arc::new(MemoryStorage::new());
        let store = DurableStore::new(backend.clone());
        save_all(&store, &snapshot);
        backend.write(corrupt, "\u{0}garbage").unwrap();

        let loaded = store.load();
        let mut expected = snapshot.clone();
        match corrupt {
            SECTION_OFFLINE_DATA => expected.offline_data = BTreeMap::new(),
            SECTION_PENDING_ACTIONS => expected.pending_actions = Vec::new(),
            SECTION_LAST_SYNC => expected.last_sync_timestamp = None,
            _ => expected.dead_letter_actions = Vec::new(),
        }
        assert_eq!(loaded, expected, "corrupting {corrupt} leaked into other sections");
    }
}

#[test]
fn wrong_shape_is_treated_as_absent() {
    let backend = Arc::new(
        MemoryStorage::new()
            .with_section(SECTION_PENDING_ACTIONS, r#"{"not":"an array"}"#)
            .with_section(SECTION_LAST_SYNC, r#""yesterday""#),
    );
    let store = DurableStore::new(backend);

    let loaded = store.load();
    assert!(loaded.pending_actions.is_empty());
    assert_eq!(loaded.last_sync_timestamp, None);
}

#[test]
fn clear_all_removes_every_section() {
    let backend = Arc::new(MemoryStorage::new());
    let store = DurableStore::new(backend.clone());
    save_all(&store, &sample_snapshot());

    assert!(store.clear_all());
    assert!(backend.is_empty());
    assert_eq!(store.load(), OfflineSnapshot::default());
}
