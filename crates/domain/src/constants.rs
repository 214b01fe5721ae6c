//! Application constants
//!
//! Persisted section keys and configuration defaults for the offline engine.

// Persisted section keys. Each section is loaded and saved independently.
pub const SECTION_OFFLINE_DATA: &str = "offlineData";
pub const SECTION_PENDING_ACTIONS: &str = "pendingActions";
pub const SECTION_LAST_SYNC: &str = "lastSyncTimestamp";
pub const SECTION_DEAD_LETTERS: &str = "deadLetterActions";

/// Every section the durable store manages, in load order
pub const ALL_SECTIONS: [&str; 4] =
    [SECTION_OFFLINE_DATA, SECTION_PENDING_ACTIONS, SECTION_LAST_SYNC, SECTION_DEAD_LETTERS];

// Retry policy defaults
pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub const DEFAULT_ESCALATION_THRESHOLD: u32 = 3;

// Connectivity and background sync defaults
pub const DEFAULT_CONNECTIVITY_POLL_SECS: u64 = 30;
pub const DEFAULT_BACKGROUND_SYNC_TAG: &str = "carebridge-offline-sync";
pub const DEFAULT_BACKGROUND_SYNC_DELAY_SECS: u64 = 15;

// Remote defaults
pub const DEFAULT_HEALTH_PATH: &str = "/health";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

// Storage defaults
pub const DEFAULT_STORAGE_PATH: &str = "carebridge-offline";
pub const DEFAULT_LOG_FILTER: &str = "info";
