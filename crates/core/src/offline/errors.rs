//! Offline engine error types
//!
//! None of these reach callers of `OfflineSyncService`: storage failures are
//! logged and in-memory state stays authoritative, execution failures bump
//! the retry count, background-sync failures degrade to manual sync.

use std::time::Duration;

use carebridge_common::error::{CommonError, ErrorClassification, ErrorSeverity};
use carebridge_common::{impl_error_classification, impl_error_conversion};
use carebridge_domain::CareBridgeError;
use thiserror::Error;

/// Storage backend failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("Section '{key}' could not be written: {message}")]
    WriteFailed { key: String, message: String },

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_conversion!(StorageError, Common);

impl_error_classification!(StorageError, Common,
    Self::Unavailable(_) => {
        retryable: true,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::WriteFailed { .. } => {
        retryable: true,
        severity: ErrorSeverity::Error,
        critical: false,
    }
);

impl From<StorageError> for CareBridgeError {
    fn from(err: StorageError) -> Self {
        Self::Storage(err.to_string())
    }
}

/// Categories of execution errors for retry logic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionErrorCategory {
    /// Connection refused, DNS, TLS - retryable
    Network,
    /// Request exceeded its deadline - retryable
    Timeout,
    /// 5xx responses - retryable
    Server,
    /// 4xx responses - the same request will keep failing
    Rejected,
    /// 429 responses - retryable after the window
    RateLimited,
    /// No handler for the action type - non-retryable
    Unsupported,
}

/// Remote execution failures for a single pending action
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Rate limited")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Unsupported action type: {0}")]
    Unsupported(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl ExecutionError {
    /// Get the error category for this error
    pub fn category(&self) -> ExecutionErrorCategory {
        match self {
            Self::Network(_) => ExecutionErrorCategory::Network,
            Self::Timeout(_) => ExecutionErrorCategory::Timeout,
            Self::Server { .. } => ExecutionErrorCategory::Server,
            Self::Rejected { .. } => ExecutionErrorCategory::Rejected,
            Self::RateLimited { .. } => ExecutionErrorCategory::RateLimited,
            Self::Unsupported(_) => ExecutionErrorCategory::Unsupported,
            Self::Common(err) if err.is_retryable() => ExecutionErrorCategory::Network,
            Self::Common(_) => ExecutionErrorCategory::Rejected,
        }
    }
}

impl_error_conversion!(ExecutionError, Common);

impl_error_classification!(ExecutionError, Common,
    Self::Network(_) => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::Timeout(_) => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
    },
    Self::Server { .. } => {
        retryable: true,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::Rejected { .. } => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    },
    Self::RateLimited { retry_after } => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
        retry_after: *retry_after,
    },
    Self::Unsupported(_) => {
        retryable: false,
        severity: ErrorSeverity::Error,
        critical: false,
    }
);

impl From<ExecutionError> for CareBridgeError {
    fn from(err: ExecutionError) -> Self {
        Self::Network(err.to_string())
    }
}

/// Platform background-sync registration failures
#[derive(Debug, Error)]
pub enum BackgroundSyncError {
    #[error("Background sync is not supported on this platform")]
    Unsupported,

    #[error("Background sync registration failed: {0}")]
    Registration(String),

    #[error(transparent)]
    Common(#[from] CommonError),
}

impl_error_classification!(BackgroundSyncError, Common,
    Self::Unsupported => {
        retryable: false,
        severity: ErrorSeverity::Info,
        critical: false,
    },
    Self::Registration(_) => {
        retryable: true,
        severity: ErrorSeverity::Warning,
        critical: false,
    }
);
