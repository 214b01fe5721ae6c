//! Shared error vocabulary for the CareBridge crates
//!
//! Each layer defines its own `thiserror` enum and embeds [`CommonError`] as a
//! transparent variant for the failures every layer can hit: bad input,
//! (de)serialization, persistence I/O, timeouts and missing capabilities.
//! [`ErrorClassification`] is how the offline engine decides whether a
//! failure is worth another attempt.
//!
//! ```rust,ignore
//! #[derive(Debug, thiserror::Error)]
//! pub enum StorageError {
//!     #[error("Storage backend unavailable: {0}")]
//!     Unavailable(String),
//!
//!     #[error(transparent)]
//!     Common(#[from] CommonError),
//! }
//!
//! impl_error_classification!(StorageError, Common,
//!     Self::Unavailable(_) => {
//!         retryable: true,
//!         severity: ErrorSeverity::Warning,
//!         critical: false,
//!     }
//! );
//! ```

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub type CommonResult<T> = Result<T, CommonError>;

/// Failures shared by every layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommonError {
    Config { message: String },

    /// Payload could not be encoded or decoded; `format` is `"JSON"` or `"TOML"`
    Serialization { format: &'static str, message: String },

    /// File or database I/O failed
    Persistence { operation: Option<String>, message: String },

    Timeout { operation: String, duration: Duration },

    Validation { field: String, message: String },

    NotFound { resource: String, id: Option<String> },

    /// The host platform lacks a facility (background sync, native events)
    Unsupported { capability: String },

    /// A broken invariant
    Internal { message: String },
}

impl fmt::Display for CommonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { message } => write!(f, "invalid configuration: {message}"),
            Self::Serialization { format, message } => {
                write!(f, "{format} (de)serialization failed: {message}")
            }
            Self::Persistence { operation: Some(op), message } => {
                write!(f, "persistence failed during {op}: {message}")
            }
            Self::Persistence { operation: None, message } => {
                write!(f, "persistence failed: {message}")
            }
            Self::Timeout { operation, duration } => {
                write!(f, "{operation} timed out after {duration:?}")
            }
            Self::Validation { field, message } => write!(f, "invalid {field}: {message}"),
            Self::NotFound { resource, id: Some(id) } => write!(f, "{resource} '{id}' not found"),
            Self::NotFound { resource, id: None } => write!(f, "{resource} not found"),
            Self::Unsupported { capability } => write!(f, "{capability} is not supported here"),
            Self::Internal { message } => write!(f, "internal error: {message}"),
        }
    }
}

impl std::error::Error for CommonError {}

impl ErrorClassification for CommonError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::Persistence { .. })
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Timeout { .. } => ErrorSeverity::Warning,
            Self::NotFound { .. } | Self::Unsupported { .. } => ErrorSeverity::Info,
            Self::Internal { .. } => ErrorSeverity::Critical,
            Self::Config { .. }
            | Self::Serialization { .. }
            | Self::Persistence { .. }
            | Self::Validation { .. } => ErrorSeverity::Error,
        }
    }

    fn is_critical(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

impl CommonError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config { message: message.into() }
    }

    pub fn serialization(format: &'static str, message: impl Into<String>) -> Self {
        Self::Serialization { format, message: message.into() }
    }

    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence { operation: None, message: message.into() }
    }

    /// Persistence failure tagged with the operation that hit it
    pub fn persistence_op(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Persistence { operation: Some(operation.into()), message: message.into() }
    }

    pub fn timeout(operation: impl Into<String>, duration: Duration) -> Self {
        Self::Timeout { operation: operation.into(), duration }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation { field: field.into(), message: message.into() }
    }

    pub fn not_found(resource: impl Into<String>, id: Option<String>) -> Self {
        Self::NotFound { resource: resource.into(), id }
    }

    pub fn unsupported(capability: impl Into<String>) -> Self {
        Self::Unsupported { capability: capability.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal { message: message.into() }
    }
}

/// Retry and reporting characteristics of an error
pub trait ErrorClassification {
    fn is_retryable(&self) -> bool;

    fn severity(&self) -> ErrorSeverity;

    /// Whether the error signals a broken invariant
    fn is_critical(&self) -> bool;

    /// Delay requested by the remote side, if any
    fn retry_after(&self) -> Option<Duration>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Info => "INFO",
            Self::Warning => "WARN",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        })
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(err: serde_json::Error) -> Self {
        Self::serialization("JSON", err.to_string())
    }
}

impl From<toml::de::Error> for CommonError {
    fn from(err: toml::de::Error) -> Self {
        Self::serialization("TOML", err.to_string())
    }
}

impl From<std::io::Error> for CommonError {
    fn from(err: std::io::Error) -> Self {
        Self::persistence(err.to_string())
    }
}

/// Route `serde_json::Error` and `std::io::Error` into a layer error through
/// its `CommonError` variant
///
/// ```rust,ignore
/// impl_error_conversion!(StorageError, Common);
/// ```
#[macro_export]
macro_rules! impl_error_conversion {
    ($error_type:ty, $variant:ident) => {
        impl From<serde_json::Error> for $error_type {
            fn from(err: serde_json::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }

        impl From<std::io::Error> for $error_type {
            fn from(err: std::io::Error) -> Self {
                Self::$variant($crate::error::CommonError::from(err))
            }
        }
    };
}

/// Implement [`ErrorClassification`] for a layer error, delegating its
/// `CommonError` variant and listing the rest explicitly
///
/// `retry_after` is optional per arm and defaults to `None`.
#[macro_export]
macro_rules! impl_error_classification {
    (
        $error_type:ty,
        $common_variant:ident
        $(,
            $variant:pat => {
                retryable: $retryable:expr,
                severity: $severity:expr,
                critical: $critical:expr
                $(, retry_after: $retry_after:expr)?
                $(,)?
            }
        )*
        $(,)?
    ) => {
        impl $crate::error::ErrorClassification for $error_type {
            fn is_retryable(&self) -> bool {
                match self {
                    Self::$common_variant(inner) => inner.is_retryable(),
                    $( $variant => $retryable, )*
                }
            }

            fn severity(&self) -> $crate::error::ErrorSeverity {
                match self {
                    Self::$common_variant(inner) => inner.severity(),
                    $( $variant => $severity, )*
                }
            }

            fn is_critical(&self) -> bool {
                match self {
                    Self::$common_variant(inner) => inner.is_critical(),
                    $( $variant => $critical, )*
                }
            }

            fn retry_after(&self) -> Option<std::time::Duration> {
                match self {
                    Self::$common_variant(inner) => inner.retry_after(),
                    $( $( $variant => $retry_after, )? )*
                    #[allow(unreachable_patterns)]
                    _ => None,
                }
            }
        }
    };
}
