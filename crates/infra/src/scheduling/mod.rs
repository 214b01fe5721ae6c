//! Background workers
//!
//! - [`ConnectivityWatcher`]: polls a connectivity probe and feeds the
//!   result into the engine
//! - [`BackgroundSyncScheduler`]: runs a delayed sync for each registered
//!   background-sync tag
//!
//! Both workers track their join handle, cancel through a
//! `CancellationToken` and bound `stop()` with a join timeout.

pub mod background_sync;
pub mod connectivity_watcher;
mod error;

pub use background_sync::{
    BackgroundSyncHandle, BackgroundSyncScheduler, BackgroundSyncSchedulerConfig,
    UnsupportedBackgroundSync,
};
pub use connectivity_watcher::{ConnectivityWatcher, ConnectivityWatcherConfig};
pub use error::{SchedulerError, SchedulerResult};
