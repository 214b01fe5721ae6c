//! Sync state and drain results

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::action::PendingAction;

/// Derived view of the offline engine, reconstructable at any time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncState {
    pub is_online: bool,
    pub is_syncing: bool,
    pub last_sync_timestamp: Option<i64>,
    pub pending_action_count: usize,
    pub dead_letter_count: usize,
}

/// Everything the durable store persists, as loaded at startup
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OfflineSnapshot {
    pub offline_data: BTreeMap<String, Value>,
    pub pending_actions: Vec<PendingAction>,
    pub last_sync_timestamp: Option<i64>,
    pub dead_letter_actions: Vec<PendingAction>,
}

/// Connectivity change reported by the monitor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectivityEdge {
    WentOnline,
    WentOffline,
}

/// Why a drain request did not start a pass
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    Offline,
    AlreadyDraining,
    EmptyQueue,
    ShuttingDown,
}

/// Counts for one completed drain pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrainReport {
    /// Actions in the snapshot
    pub attempted: usize,
    /// Executed successfully and removed from the queue
    pub completed: usize,
    /// Failed and kept for a later pass
    pub failed: usize,
    /// Failed for the last allowed time and moved to the dead-letter list
    pub dead_lettered: usize,
    /// Still queued but past the escalation threshold
    pub escalated: usize,
    /// Longest wait the remote asked for before the failed actions are retried
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after_ms: Option<u64>,
}

impl DrainReport {
    /// True when every attempted action completed
    pub fn is_complete(&self) -> bool {
        self.failed == 0 && self.dead_lettered == 0 && self.completed == self.attempted
    }

    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after_ms.map(Duration::from_millis)
    }
}

/// Result of a drain request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status", content = "detail")]
pub enum DrainOutcome {
    Skipped(SkipReason),
    Completed(DrainReport),
}

impl DrainOutcome {
    pub fn report(&self) -> Option<&DrainReport> {
        match self {
            Self::Completed(report) => Some(report),
            Self::Skipped(_) => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped(_))
    }
}
