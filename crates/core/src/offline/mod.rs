//! Offline resilience engine
//!
//! Components, leaves first:
//! - [`ConnectivityMonitor`]: current online state plus edge detection
//! - [`DurableStore`]: section-wise persistence over a [`StorageBackend`]
//! - [`OfflineCache`]: keyed payloads for offline reads
//! - [`ActionQueue`]: pending mutations with retry metadata and dead letters
//! - [`SyncReconciler`]: drains the queue against an [`ExecutionSink`]
//! - [`BackgroundSyncBridge`]: best-effort platform background-sync
//!   registration
//!
//! [`OfflineSyncService`](service::OfflineSyncService) wires them together.
//!
//! [`StorageBackend`]: ports::StorageBackend
//! [`ExecutionSink`]: ports::ExecutionSink

pub mod background;
pub mod cache;
pub mod connectivity;
pub mod errors;
pub mod memory;
pub mod notices;
pub mod ports;
pub mod queue;
pub mod reconciler;
pub mod service;
pub mod store;

pub use background::BackgroundSyncBridge;
pub use cache::OfflineCache;
pub use connectivity::ConnectivityMonitor;
pub use memory::MemoryStorage;
pub use queue::ActionQueue;
pub use reconciler::{RetryPolicy, SyncReconciler};
pub use store::DurableStore;
