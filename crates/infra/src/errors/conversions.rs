//! Conversions from external infrastructure errors into domain errors.

use std::io;

use carebridge_core::StorageError;
use carebridge_domain::CareBridgeError;
use reqwest::Error as HttpError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub CareBridgeError);

impl std::fmt::Display for InfraError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::error::Error for InfraError {}

impl From<InfraError> for CareBridgeError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<CareBridgeError> for InfraError {
    fn from(value: CareBridgeError) -> Self {
        InfraError(value)
    }
}

impl From<InfraError> for StorageError {
    fn from(value: InfraError) -> Self {
        StorageError::Unavailable(value.0.to_string())
    }
}

trait IntoCareBridgeError {
    fn into_carebridge(self) -> CareBridgeError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → CareBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoCareBridgeError for SqlError {
    fn into_carebridge(self) -> CareBridgeError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match err.code {
                    ErrorCode::DatabaseBusy => CareBridgeError::Storage("database is busy".into()),
                    ErrorCode::DatabaseLocked => {
                        CareBridgeError::Storage("database is locked".into())
                    }
                    ErrorCode::NotADatabase => {
                        CareBridgeError::Storage("file is not a sqlite database".into())
                    }
                    ErrorCode::DiskFull => CareBridgeError::Storage("disk is full".into()),
                    _ => CareBridgeError::Storage(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::QueryReturnedNoRows => {
                CareBridgeError::NotFound("no rows returned by query".into())
            }
            RE::FromSqlConversionFailure(_, _, cause) => {
                CareBridgeError::Storage(format!("failed to convert sqlite value: {cause}"))
            }
            RE::InvalidColumnType(_, _, ty) => {
                CareBridgeError::Storage(format!("invalid column type: {ty}"))
            }
            RE::InvalidPath(path) => CareBridgeError::Storage(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => CareBridgeError::Storage(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_carebridge())
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → CareBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoCareBridgeError for HttpError {
    fn into_carebridge(self) -> CareBridgeError {
        if self.is_builder() {
            return CareBridgeError::Config(format!("invalid HTTP client configuration: {self}"));
        }
        if self.is_timeout() {
            return CareBridgeError::Network(format!("request timed out: {self}"));
        }
        if self.is_decode() {
            return CareBridgeError::Serialization(format!("invalid response body: {self}"));
        }
        CareBridgeError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_carebridge())
    }
}

/* -------------------------------------------------------------------------- */
/* std::io::Error → CareBridgeError */
/* -------------------------------------------------------------------------- */

impl IntoCareBridgeError for io::Error {
    fn into_carebridge(self) -> CareBridgeError {
        match self.kind() {
            io::ErrorKind::NotFound => CareBridgeError::NotFound(self.to_string()),
            io::ErrorKind::PermissionDenied => {
                CareBridgeError::Storage(format!("permission denied: {self}"))
            }
            _ => CareBridgeError::Storage(self.to_string()),
        }
    }
}

impl From<io::Error> for InfraError {
    fn from(value: io::Error) -> Self {
        InfraError(value.into_carebridge())
    }
}
