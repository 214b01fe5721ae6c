//! Best-effort background sync registration
//!
//! Nothing else in the engine depends on registration succeeding; when the
//! platform lacks the facility the engine degrades to polling and manual
//! sync.

use std::sync::Arc;
use std::time::Duration;

use carebridge_common::error::ErrorClassification;
use tracing::{debug, info, warn};

use super::errors::BackgroundSyncError;
use super::ports::BackgroundSyncRegistrar;

pub struct BackgroundSyncBridge {
    registrar: Option<Arc<dyn BackgroundSyncRegistrar>>,
    tag: String,
}

impl BackgroundSyncBridge {
    pub fn new(
        registrar: Option<Arc<dyn BackgroundSyncRegistrar>>,
        tag: impl Into<String>,
    ) -> Self {
        Self { registrar, tag: tag.into() }
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn is_configured(&self) -> bool {
        self.registrar.is_some()
    }

    /// Register the sync tag with the platform
    ///
    /// Never fails: errors are logged and reported as `false`.
    pub async fn register_if_supported(&self) -> bool {
        self.register_after(None).await
    }

    /// Register the sync tag, holding the run back by `min_delay` when the
    /// remote asked for a wait
    pub async fn register_after(&self, min_delay: Option<Duration>) -> bool {
        let Some(registrar) = &self.registrar else {
            debug!(tag = %self.tag, "No background sync registrar configured");
            return false;
        };

        let result = match min_delay {
            Some(delay) => registrar.register_after(&self.tag, delay).await,
            None => registrar.register(&self.tag).await,
        };

        match result {
            Ok(()) => {
                debug!(tag = %self.tag, min_delay = ?min_delay, "Registered background sync");
                true
            }
            Err(BackgroundSyncError::Unsupported) => {
                info!(tag = %self.tag, "Background sync unsupported; relying on manual sync");
                false
            }
            Err(err) => {
                warn!(
                    tag = %self.tag,
                    error = %err,
                    retryable = err.is_retryable(),
                    "Background sync registration failed"
                );
                false
            }
        }
    }
}
