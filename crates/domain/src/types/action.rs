//! Queued mutation record

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// A recorded intent to perform a remote mutation that has not yet been
/// confirmed as applied.
///
/// The wire layout (`id`, `type`, `payload`, `timestamp`, `retryCount`) is
/// what gets persisted in the `pendingActions` section, so field renames here
/// are a storage migration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingAction {
    pub id: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub payload: Value,
    /// Creation time in epoch milliseconds
    pub timestamp: i64,
    #[serde(default)]
    pub retry_count: u32,
}

impl PendingAction {
    /// Build a fresh action with a new unique id and no failed attempts
    pub fn new(action_type: impl Into<String>, payload: Value, timestamp: i64) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            action_type: action_type.into(),
            payload,
            timestamp,
            retry_count: 0,
        }
    }

    /// Copy of this action with one more failed attempt recorded
    #[must_use]
    pub fn with_failed_attempt(&self) -> Self {
        Self { retry_count: self.retry_count.saturating_add(1), ..self.clone() }
    }

    /// Decode the payload into a typed value
    ///
    /// # Errors
    /// Returns the serde error when the payload does not match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.payload)
    }

    /// Creation time as a UTC datetime, if the timestamp is in range
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}
