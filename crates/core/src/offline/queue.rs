//! Pending-action queue with retry metadata and dead letters
//!
//! Insertion order is preserved. Every mutation persists the affected
//! section before the lock is released, so the stored copy never runs ahead
//! of or behind the in-memory queue.

use std::sync::Arc;

use carebridge_common::time::Clock;
use carebridge_domain::constants::{SECTION_DEAD_LETTERS, SECTION_PENDING_ACTIONS};
use carebridge_domain::PendingAction;
use parking_lot::{Mutex, MutexGuard};
use serde_json::Value;
use tracing::{debug, info, warn};

use super::store::DurableStore;

/// Queue contents guarded by a single lock
#[derive(Debug, Default)]
pub(crate) struct QueueState {
    pending: Vec<PendingAction>,
    dead_letters: Vec<PendingAction>,
    /// Bumped by `clear`; lets an in-flight drain detect a reset
    generation: u64,
}

impl QueueState {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn clear(&mut self) {
        self.pending.clear();
        self.dead_letters.clear();
        self.generation = self.generation.wrapping_add(1);
    }
}

pub struct ActionQueue {
    state: Mutex<QueueState>,
    store: Arc<DurableStore>,
    clock: Arc<dyn Clock>,
}

impl ActionQueue {
    pub fn new(
        store: Arc<DurableStore>,
        clock: Arc<dyn Clock>,
        pending: Vec<PendingAction>,
        dead_letters: Vec<PendingAction>,
    ) -> Self {
        let state = QueueState { pending, dead_letters, generation: 0 };
        Self { state: Mutex::new(state), store, clock }
    }

    /// Append a fresh action and persist the queue
    pub fn enqueue(&self, action_type: impl Into<String>, payload: Value) -> PendingAction {
        let action = PendingAction::new(action_type, payload, self.clock.now_millis());
        let mut state = self.state.lock();
        state.pending.push(action.clone());
        self.store.persist(SECTION_PENDING_ACTIONS, &state.pending);
        debug!(
            action_id = %action.id,
            action_type = %action.action_type,
            pending = state.pending.len(),
            "Queued pending action"
        );
        action
    }

    /// Copy of the queue as it stands when a drain begins
    ///
    /// Actions enqueued after this call are not part of the returned pass.
    pub fn snapshot_for_drain(&self) -> Vec<PendingAction> {
        self.state.lock().pending.clone()
    }

    /// Snapshot plus the clear generation it was taken in, read under one lock
    pub(crate) fn snapshot_with_generation(&self) -> (u64, Vec<PendingAction>) {
        let state = self.state.lock();
        (state.generation, state.pending.clone())
    }

    /// Remove a successfully executed action. Returns false if it was
    /// already gone.
    pub fn mark_completed(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.pending.len();
        state.pending.retain(|action| action.id != id);
        let removed = state.pending.len() != before;
        if removed {
            self.store.persist(SECTION_PENDING_ACTIONS, &state.pending);
        }
        removed
    }

    /// Replace the queued entry with a copy carrying one more failed attempt
    ///
    /// Returns the updated entry, or `None` when the action is no longer
    /// queued (completed elsewhere or cleared mid-drain).
    pub fn mark_failed(&self, action: &PendingAction) -> Option<PendingAction> {
        let mut state = self.state.lock();
        let slot = state.pending.iter_mut().find(|entry| entry.id == action.id)?;
        *slot = action.with_failed_attempt();
        let updated = slot.clone();
        self.store.persist(SECTION_PENDING_ACTIONS, &state.pending);
        Some(updated)
    }

    /// Move a permanently failed action to the dead-letter list
    ///
    /// `action` is stored with one more failed attempt recorded. Returns
    /// false when the action is no longer queued.
    pub fn dead_letter(&self, action: &PendingAction) -> bool {
        let mut state = self.state.lock();
        let Some(index) = state.pending.iter().position(|entry| entry.id == action.id) else {
            return false;
        };
        state.pending.remove(index);
        let abandoned = action.with_failed_attempt();
        warn!(
            action_id = %abandoned.id,
            action_type = %abandoned.action_type,
            retry_count = abandoned.retry_count,
            "Moving action to dead-letter list"
        );
        state.dead_letters.push(abandoned);
        self.store.persist(SECTION_PENDING_ACTIONS, &state.pending);
        self.store.persist(SECTION_DEAD_LETTERS, &state.dead_letters);
        true
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().pending.is_empty()
    }

    pub fn dead_letters(&self) -> Vec<PendingAction> {
        self.state.lock().dead_letters.clone()
    }

    pub fn dead_letter_count(&self) -> usize {
        self.state.lock().dead_letters.len()
    }

    /// Re-enqueue a dead-lettered action as a fresh action
    ///
    /// The new action keeps the type and payload but gets a new id, a new
    /// timestamp and a zero retry count.
    pub fn resubmit_dead_letter(&self, id: &str) -> Option<PendingAction> {
        let mut state = self.state.lock();
        let index = state.dead_letters.iter().position(|entry| entry.id == id)?;
        let abandoned = state.dead_letters.remove(index);
        let fresh =
            PendingAction::new(abandoned.action_type, abandoned.payload, self.clock.now_millis());
        state.pending.push(fresh.clone());
        self.store.persist(SECTION_DEAD_LETTERS, &state.dead_letters);
        self.store.persist(SECTION_PENDING_ACTIONS, &state.pending);
        info!(previous_id = %id, action_id = %fresh.id, "Resubmitted dead-lettered action");
        Some(fresh)
    }

    /// Drop a dead-lettered action for good
    pub fn discard_dead_letter(&self, id: &str) -> bool {
        let mut state = self.state.lock();
        let before = state.dead_letters.len();
        state.dead_letters.retain(|entry| entry.id != id);
        let removed = state.dead_letters.len() != before;
        if removed {
            self.store.persist(SECTION_DEAD_LETTERS, &state.dead_letters);
            info!(action_id = %id, "Discarded dead-lettered action");
        }
        removed
    }

    /// Write both sections regardless of whether they changed
    pub fn flush(&self) -> bool {
        let state = self.state.lock();
        let pending = self.store.persist(SECTION_PENDING_ACTIONS, &state.pending);
        let dead = self.store.persist(SECTION_DEAD_LETTERS, &state.dead_letters);
        pending && dead
    }

    /// Held during an atomic clear across cache, queue and last-sync state
    pub(crate) fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock()
    }
}

#[cfg(test)]
mod tests {
    use carebridge_common::time::MockClock;
    use serde_json::json;

    use super::*;
    use crate::offline::memory::MemoryStorage;

    fn queue() -> (ActionQueue, Arc<DurableStore>) {
        let store = Arc::new(DurableStore::new(Arc::new(MemoryStorage::new())));
        let queue =
            ActionQueue::new(store.clone(), Arc::new(MockClock::at(1_000)), Vec::new(), Vec::new());
        (queue, store)
    }

    #[test]
    fn enqueue_stamps_and_persists() {
        let (queue, store) = queue();
        let action = queue.enqueue("createContact", json!({"name": "Jane"}));

        assert_eq!(action.timestamp, 1_000);
        assert_eq!(action.retry_count, 0);
        assert_eq!(store.load().pending_actions, vec![action]);
    }

    #[test]
    fn snapshot_excludes_later_enqueues() {
        let (queue, _) = queue();
        queue.enqueue("a", Value::Null);
        let snapshot = queue.snapshot_for_drain();
        queue.enqueue("b", Value::Null);

        assert_eq!(snapshot.len(), 1);
        assert_eq!(queue.len(), 2);
    }

    /// Validates `ActionQueue::mark_failed` behavior for the repeated failure
    /// scenario.
    ///
    /// Assertions:
    /// - Confirms each call increments `retry_count` by exactly one.
    /// - Confirms the entry keeps its queue position.
    #[test]
    fn mark_failed_increments_in_place() {
        let (queue, _) = queue();
        let first = queue.enqueue("a", Value::Null);
        queue.enqueue("b", Value::Null);

        let once = queue.mark_failed(&first).unwrap();
        let twice = queue.mark_failed(&once).unwrap();

        assert_eq!(once.retry_count, 1);
        assert_eq!(twice.retry_count, 2);
        assert_eq!(queue.snapshot_for_drain()[0].id, first.id);
    }

    #[test]
    fn mark_on_missing_action_is_a_no_op() {
        let (queue, _) = queue();
        let ghost = PendingAction::new("ghost", Value::Null, 0);

        assert!(!queue.mark_completed(&ghost.id));
        assert!(queue.mark_failed(&ghost).is_none());
        assert!(!queue.dead_letter(&ghost));
    }

    #[test]
    fn dead_letter_moves_action_once() {
        let (queue, store) = queue();
        let action = queue.enqueue("sendEmail", json!({"to": "x"}));

        assert!(queue.dead_letter(&action));
        assert!(!queue.dead_letter(&action));
        assert!(queue.is_empty());

        let persisted = store.load();
        assert!(persisted.pending_actions.is_empty());
        assert_eq!(persisted.dead_letter_actions.len(), 1);
        assert_eq!(persisted.dead_letter_actions[0].retry_count, 1);
    }

    #[test]
    fn resubmit_creates_fresh_action() {
        let (queue, _) = queue();
        let action = queue.enqueue("createDeal", json!({"title": "Renewal"}));
        queue.dead_letter(&action);

        let fresh = queue.resubmit_dead_letter(&action.id).unwrap();
        assert_ne!(fresh.id, action.id);
        assert_eq!(fresh.retry_count, 0);
        assert_eq!(fresh.payload, action.payload);
        assert_eq!(queue.dead_letter_count(), 0);
        assert_eq!(queue.len(), 1);
        assert!(queue.resubmit_dead_letter(&action.id).is_none());
    }

    #[test]
    fn discard_removes_dead_letter() {
        let (queue, store) = queue();
        let action = queue.enqueue("logActivity", Value::Null);
        queue.dead_letter(&action);

        assert!(queue.discard_dead_letter(&action.id));
        assert!(!queue.discard_dead_letter(&action.id));
        assert!(store.load().dead_letter_actions.is_empty());
        assert!(store.load().pending_actions.is_empty());
    }

    #[test]
    fn clear_bumps_generation() {
        let (queue, _) = queue();
        queue.enqueue("a", Value::Null);
        let (before, snapshot) = queue.snapshot_with_generation();

        queue.lock_state().clear();

        assert_eq!(snapshot.len(), 1);
        assert!(queue.is_empty());
        assert_ne!(queue.lock_state().generation(), before);
    }

    #[test]
    fn snapshot_and_generation_agree() {
        let (queue, _) = queue();
        queue.enqueue("a", Value::Null);
        queue.lock_state().clear();
        let b = queue.enqueue("b", Value::Null);

        let (generation, snapshot) = queue.snapshot_with_generation();

        // Taken after the clear: only the later action, stamped with the new generation
        assert_eq!(snapshot.iter().map(|a| a.id.as_str()).collect::<Vec<_>>(), vec![b.id.as_str()]);
        assert_eq!(generation, queue.lock_state().generation());
        assert_ne!(generation, 0);
    }
}
