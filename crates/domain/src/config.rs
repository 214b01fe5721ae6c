//! Configuration structures
//!
//! Every section has serde defaults so partial TOML/JSON files and
//! environment overrides can be layered onto [`OfflineConfig::default`].

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_BACKGROUND_SYNC_DELAY_SECS, DEFAULT_BACKGROUND_SYNC_TAG,
    DEFAULT_CONNECTIVITY_POLL_SECS, DEFAULT_ESCALATION_THRESHOLD, DEFAULT_HEALTH_PATH,
    DEFAULT_LOG_FILTER, DEFAULT_MAX_ATTEMPTS, DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_STORAGE_PATH,
};
use crate::errors::{CareBridgeError, Result};
use crate::impl_domain_status_conversions;

/// Offline engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OfflineConfig {
    pub storage: StorageConfig,
    pub sync: SyncConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Which storage backend persists the offline sections
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackendKind {
    #[default]
    File,
    Sqlite,
    Memory,
}

impl_domain_status_conversions!(StorageBackendKind {
    File => "file",
    Sqlite => "sqlite",
    Memory => "memory",
});

/// Storage configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackendKind,
    /// Directory for the file backend, database file for sqlite
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self { backend: StorageBackendKind::default(), path: PathBuf::from(DEFAULT_STORAGE_PATH) }
    }
}

/// Retry, connectivity and background sync policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Failed attempts after which an action is dead-lettered
    pub max_attempts: u32,
    /// Failed attempts after which a queued action is escalated to the user
    pub escalation_threshold: u32,
    pub connectivity_poll_interval_secs: u64,
    pub background_sync_tag: String,
    pub background_sync_delay_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            escalation_threshold: DEFAULT_ESCALATION_THRESHOLD,
            connectivity_poll_interval_secs: DEFAULT_CONNECTIVITY_POLL_SECS,
            background_sync_tag: DEFAULT_BACKGROUND_SYNC_TAG.to_string(),
            background_sync_delay_secs: DEFAULT_BACKGROUND_SYNC_DELAY_SECS,
        }
    }
}

impl SyncConfig {
    pub fn connectivity_poll_interval(&self) -> Duration {
        Duration::from_secs(self.connectivity_poll_interval_secs)
    }

    pub fn background_sync_delay(&self) -> Duration {
        Duration::from_secs(self.background_sync_delay_secs)
    }
}

/// Remote CRM endpoint configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the CRM API; `None` runs without a transport
    pub base_url: Option<String>,
    pub health_path: String,
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

impl RemoteConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filter: DEFAULT_LOG_FILTER.to_string(), json: false }
    }
}

impl OfflineConfig {
    /// Reject settings the engine cannot run with
    ///
    /// # Errors
    /// Returns [`CareBridgeError::Config`] naming the offending field.
    pub fn validate(&self) -> Result<()> {
        if self.sync.max_attempts == 0 {
            return Err(CareBridgeError::Config("sync.max_attempts must be at least 1".into()));
        }
        if self.sync.escalation_threshold == 0 {
            return Err(CareBridgeError::Config(
                "sync.escalation_threshold must be at least 1".into(),
            ));
        }
        if self.sync.background_sync_tag.trim().is_empty() {
            return Err(CareBridgeError::Config(
                "sync.background_sync_tag must not be empty".into(),
            ));
        }
        if self.remote.request_timeout_secs == 0 {
            return Err(CareBridgeError::Config(
                "remote.request_timeout_secs must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}
