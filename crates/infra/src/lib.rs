//! # CareBridge Infrastructure
//!
//! Infrastructure implementations of the offline engine's ports.
//!
//! This crate contains:
//! - Storage backends (one JSON file per section, SQLite)
//! - The HTTP execution sink and connectivity probe
//! - Background workers (connectivity watcher, background sync scheduler)
//! - Status sinks (tracing, broadcast, fan-out)
//! - Configuration loading and logging initialisation
//! - [`OfflineRuntime`], which wires all of the above from an
//!   `OfflineConfig`
//!
//! ## Architecture
//! - Implements traits defined in `carebridge-core`
//! - Contains all "impure" code (filesystem, database, network)

pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod runtime;
pub mod scheduling;
pub mod status;
pub mod storage;

pub use errors::InfraError;
pub use http::{HttpConnectivityProbe, HttpExecutionSink};
pub use runtime::{OfflineRuntime, OfflineRuntimeBuilder};
pub use scheduling::{
    BackgroundSyncHandle, BackgroundSyncScheduler, ConnectivityWatcher, SchedulerError,
    UnsupportedBackgroundSync,
};
pub use status::{BroadcastStatusSink, FanoutStatusSink, TracingStatusSink};
pub use storage::{open_backend, FileStorage, SqliteStorage};
