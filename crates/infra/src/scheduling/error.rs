//! Scheduler error types

use carebridge_domain::CareBridgeError;
use thiserror::Error;

use crate::errors::InfraError;

/// Errors from starting and stopping background workers
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("Scheduler already running")]
    AlreadyRunning,

    #[error("Scheduler not running")]
    NotRunning,

    /// The worker's inbox was lost when a previous run panicked
    #[error("Scheduler channel closed")]
    ChannelClosed,

    #[error("Operation timed out after {millis}ms")]
    Timeout { millis: u64 },

    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let domain_err = match err {
            SchedulerError::AlreadyRunning | SchedulerError::NotRunning => {
                CareBridgeError::InvalidInput(err.to_string())
            }
            _ => CareBridgeError::Internal(err.to_string()),
        };
        InfraError(domain_err)
    }
}

impl From<SchedulerError> for CareBridgeError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
