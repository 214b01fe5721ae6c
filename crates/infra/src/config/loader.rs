//! Configuration loader
//!
//! Loads the offline engine configuration from environment variables or
//! files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `CAREBRIDGE_STORAGE_PATH` is unset, falls back to loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! Every loaded configuration is validated before it is returned.
//!
//! ## Environment Variables
//! - `CAREBRIDGE_STORAGE_PATH`: Storage directory or database file (required)
//! - `CAREBRIDGE_STORAGE_BACKEND`: `file`, `sqlite` or `memory`
//! - `CAREBRIDGE_REMOTE_URL`: Base URL of the CRM API
//! - `CAREBRIDGE_HEALTH_PATH`: Health endpoint path
//! - `CAREBRIDGE_REQUEST_TIMEOUT_SECS`: Per-request timeout
//! - `CAREBRIDGE_MAX_ATTEMPTS`: Failed attempts before dead-lettering
//! - `CAREBRIDGE_ESCALATION_THRESHOLD`: Failed attempts before escalating
//! - `CAREBRIDGE_POLL_INTERVAL_SECS`: Connectivity poll interval
//! - `CAREBRIDGE_BACKGROUND_SYNC_TAG`: Background sync tag
//! - `CAREBRIDGE_BACKGROUND_SYNC_DELAY_SECS`: Delay before a background sync
//! - `CAREBRIDGE_LOG_FILTER`: Default log filter directive
//! - `CAREBRIDGE_LOG_JSON`: Emit JSON logs (true/false)
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./carebridge.toml` or `./carebridge.json` (current working directory)
//! 2. `./config.toml` or `./config.json` (current working directory)
//! 3. The same names in the parent directory
//! 4. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;

use carebridge_domain::{CareBridgeError, OfflineConfig, Result, StorageBackendKind};

const CONFIG_FILE_NAMES: [&str; 4] =
    ["carebridge.toml", "carebridge.json", "config.toml", "config.json"];

/// Load configuration with automatic fallback strategy
///
/// # Errors
/// Returns `CareBridgeError::Config` if:
/// - Configuration cannot be loaded from either source
/// - File format is invalid
/// - A value fails validation
pub fn load() -> Result<OfflineConfig> {
    match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            Ok(config)
        }
        Err(e) => {
            tracing::debug!(error = ?e, "Failed to load from environment, trying file");
            load_from_file(None)
        }
    }
}

/// Load configuration from environment variables
///
/// `CAREBRIDGE_STORAGE_PATH` is required; every other variable overrides
/// the matching default when present.
///
/// # Errors
/// Returns `CareBridgeError::Config` if the required variable is missing or
/// a value is invalid.
pub fn load_from_env() -> Result<OfflineConfig> {
    let mut config = OfflineConfig::default();

    config.storage.path = PathBuf::from(env_var("CAREBRIDGE_STORAGE_PATH")?);
    if let Some(backend) = env_opt("CAREBRIDGE_STORAGE_BACKEND") {
        config.storage.backend = StorageBackendKind::from_str(&backend.to_ascii_lowercase())
            .map_err(|e| CareBridgeError::Config(format!("Invalid storage backend: {e}")))?;
    }

    if let Some(url) = env_opt("CAREBRIDGE_REMOTE_URL") {
        config.remote.base_url = Some(url);
    }
    if let Some(path) = env_opt("CAREBRIDGE_HEALTH_PATH") {
        config.remote.health_path = path;
    }
    if let Some(secs) = env_parse("CAREBRIDGE_REQUEST_TIMEOUT_SECS", "request timeout")? {
        config.remote.request_timeout_secs = secs;
    }

    if let Some(max) = env_parse("CAREBRIDGE_MAX_ATTEMPTS", "max attempts")? {
        config.sync.max_attempts = max;
    }
    if let Some(threshold) = env_parse("CAREBRIDGE_ESCALATION_THRESHOLD", "escalation threshold")? {
        config.sync.escalation_threshold = threshold;
    }
    if let Some(secs) = env_parse("CAREBRIDGE_POLL_INTERVAL_SECS", "poll interval")? {
        config.sync.connectivity_poll_interval_secs = secs;
    }
    if let Some(tag) = env_opt("CAREBRIDGE_BACKGROUND_SYNC_TAG") {
        config.sync.background_sync_tag = tag;
    }
    if let Some(secs) = env_parse("CAREBRIDGE_BACKGROUND_SYNC_DELAY_SECS", "background sync delay")?
    {
        config.sync.background_sync_delay_secs = secs;
    }

    if let Some(filter) = env_opt("CAREBRIDGE_LOG_FILTER") {
        config.logging.filter = filter;
    }
    config.logging.json = env_bool("CAREBRIDGE_LOG_JSON", config.logging.json);

    config.validate()?;
    Ok(config)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Errors
/// Returns `CareBridgeError::Config` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
/// - A value fails validation
pub fn load_from_file(path: Option<PathBuf>) -> Result<OfflineConfig> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(CareBridgeError::Config(format!(
                    "Config file not found: {}",
                    p.display()
                )));
            }
            p
        }
        None => probe_config_paths().ok_or_else(|| {
            CareBridgeError::Config(
                "No config file found in any of the standard locations".to_string(),
            )
        })?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)
        .map_err(|e| CareBridgeError::Config(format!("Failed to read config file: {e}")))?;

    parse_config(&contents, &config_path)
}

/// Parse and validate configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`). Missing
/// sections and fields take their defaults.
///
/// # Errors
/// Returns `CareBridgeError::Config` if format is invalid, parsing fails or
/// a value fails validation.
pub fn parse_config(contents: &str, path: &Path) -> Result<OfflineConfig> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    let config: OfflineConfig = match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| CareBridgeError::Config(format!("Invalid TOML format: {e}")))?,
        "json" => serde_json::from_str(contents)
            .map_err(|e| CareBridgeError::Config(format!("Invalid JSON format: {e}")))?,
        _ => {
            return Err(CareBridgeError::Config(format!(
                "Unsupported config format: {extension}"
            )))
        }
    };

    config.validate()?;
    Ok(config)
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    let mut dirs = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        dirs.push(cwd.clone());
        dirs.push(cwd.join(".."));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            dirs.push(exe_dir.to_path_buf());
        }
    }

    dirs.iter()
        .flat_map(|dir| CONFIG_FILE_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

/// Get required environment variable
///
/// # Errors
/// Returns `CareBridgeError::Config` if the variable is not set.
fn env_var(key: &str) -> Result<String> {
    std::env::var(key).map_err(|_| {
        CareBridgeError::Config(format!("Missing required environment variable: {key}"))
    })
}

/// Optional variable; empty values count as unset
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn env_parse<T>(key: &str, what: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|e| CareBridgeError::Config(format!("Invalid {what}: {e}")))
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
