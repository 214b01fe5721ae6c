//! Logging initialisation
//!
//! Installs a global `tracing-subscriber` registry with an [`EnvFilter`].
//! `RUST_LOG` wins over the configured filter so operators can raise the
//! level without editing config files.

use carebridge_domain::constants::DEFAULT_LOG_FILTER;
use carebridge_domain::LoggingConfig;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Resolve the effective filter: `RUST_LOG`, then the config, then `info`
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global subscriber
///
/// Returns `false` when a global subscriber was already installed, in which
/// case the existing one is left untouched.
pub fn init(config: &LoggingConfig) -> bool {
    let filter = build_filter(config);

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_current_span(true))
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .try_init()
            .is_ok()
    };

    if installed {
        tracing::debug!(filter = %config.filter, json = config.json, "logging initialised");
    }
    installed
}
