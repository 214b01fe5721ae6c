//! # CareBridge Core
//!
//! The offline resilience engine: business rules with no infrastructure
//! dependencies.
//!
//! This crate contains:
//! - Port interfaces (storage, execution, status, connectivity, background
//!   sync)
//! - The durable store, offline cache and action queue
//! - The sync reconciler and its drain algorithm
//! - `OfflineSyncService`, the single handle the application talks to
//!
//! ## Architecture Principles
//! - Only depends on `carebridge-common` and `carebridge-domain`
//! - No filesystem, database, HTTP, or platform code
//! - All external collaborators via traits
//! - Pure, testable business logic

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]

pub mod offline;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-export specific items to avoid ambiguity
pub use offline::errors::{BackgroundSyncError, ExecutionError, StorageError};
pub use offline::ports::{
    BackgroundSyncRegistrar, ConnectivityProbe, ExecutionSink, StatusSink, StorageBackend,
};
pub use offline::service::{OfflineSyncDeps, OfflineSyncService, SyncSettings};
pub use offline::{
    ActionQueue, BackgroundSyncBridge, ConnectivityMonitor, DurableStore, MemoryStorage,
    OfflineCache, RetryPolicy, SyncReconciler,
};
