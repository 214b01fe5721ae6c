//! Port interfaces for the offline engine
//!
//! Storage and status notification are synchronous from the caller's point
//! of view. Execution, connectivity probing and background-sync registration
//! are the awaited suspension points.

use std::time::Duration;

use async_trait::async_trait;
use carebridge_domain::{PendingAction, StatusEvent};

use super::errors::{BackgroundSyncError, ExecutionError, StorageError};

/// Key-value persistence for whole offline sections
///
/// Writes replace the stored value for a key in one step; readers see either
/// the old or the new section, never a mix.
pub trait StorageBackend: Send + Sync {
    /// Read the raw serialized section, `None` when absent
    fn read(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Replace the section stored under `key`
    fn write(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the section; removing an absent key succeeds
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Short name used in log fields
    fn backend_name(&self) -> &'static str {
        "storage"
    }
}

/// Carries out a pending action against the remote system
#[async_trait]
pub trait ExecutionSink: Send + Sync {
    /// Resolve on success, reject on failure
    async fn execute(&self, action: &PendingAction) -> Result<(), ExecutionError>;
}

/// Receives human-readable status events (the CRM toast layer)
pub trait StatusSink: Send + Sync {
    fn notify(&self, event: StatusEvent);
}

/// Checks real connectivity, independent of cached state
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn check(&self) -> bool;
}

/// Platform facility for deferred sync outside the active session
#[async_trait]
pub trait BackgroundSyncRegistrar: Send + Sync {
    async fn register(&self, tag: &str) -> Result<(), BackgroundSyncError>;

    /// Register, asking that the sync not run before `min_delay` has passed
    ///
    /// Platforms that cannot delay a registration fall back to `register`.
    async fn register_after(
        &self,
        tag: &str,
        _min_delay: Duration,
    ) -> Result<(), BackgroundSyncError> {
        self.register(tag).await
    }
}
