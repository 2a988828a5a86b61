//! Conversions from external infrastructure errors into domain errors.

use std::io::Error as IoError;

use reqwest::Error as HttpError;
use restsync_domain::SyncError;
use rusqlite::Error as SqlError;

/// Error newtype that keeps conversions on the infrastructure side and can be
/// converted back into the domain error.
#[derive(Debug)]
pub struct InfraError(pub SyncError);

impl From<InfraError> for SyncError {
    fn from(value: InfraError) -> Self {
        value.0
    }
}

impl From<SyncError> for InfraError {
    fn from(value: SyncError) -> Self {
        InfraError(value)
    }
}

/// Shorthand for `map_err(|e| SyncError::from(InfraError::from(e)))`.
pub fn to_sync_error<E>(err: E) -> SyncError
where
    InfraError: From<E>,
{
    InfraError::from(err).into()
}

trait IntoSyncError {
    fn into_sync(self) -> SyncError;
}

/* -------------------------------------------------------------------------- */
/* rusqlite::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl IntoSyncError for SqlError {
    fn into_sync(self) -> SyncError {
        use rusqlite::ffi::ErrorCode;
        use rusqlite::Error as RE;

        match self {
            RE::SqliteFailure(err, maybe_message) => {
                let message = maybe_message.unwrap_or_default();
                match (err.code, err.extended_code) {
                    (ErrorCode::DatabaseBusy, _) => SyncError::Persistence("database is busy".into()),
                    (ErrorCode::DatabaseLocked, _) => {
                        SyncError::Persistence("database is locked".into())
                    }
                    (ErrorCode::ConstraintViolation, 2067 | 1555) => {
                        SyncError::Persistence(format!("unique constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 1299) => {
                        SyncError::Persistence(format!("not null constraint violation: {message}"))
                    }
                    (ErrorCode::ConstraintViolation, 787) => {
                        SyncError::Persistence("foreign key constraint violation".into())
                    }
                    (ErrorCode::CannotOpen, _) => {
                        SyncError::Persistence(format!("unable to open database: {message}"))
                    }
                    _ => SyncError::Persistence(format!(
                        "sqlite failure {:?} (code {}): {}",
                        err.code, err.extended_code, message
                    )),
                }
            }
            RE::ToSqlConversionFailure(cause) => {
                SyncError::Persistence(format!("failed to bind value: {cause}"))
            }
            RE::InvalidParameterCount(given, expected) => SyncError::Persistence(format!(
                "statement expects {expected} parameters, {given} given"
            )),
            RE::InvalidPath(path) => SyncError::Persistence(format!(
                "invalid database path: {}",
                path.to_string_lossy()
            )),
            other => SyncError::Persistence(other.to_string()),
        }
    }
}

impl From<SqlError> for InfraError {
    fn from(value: SqlError) -> Self {
        InfraError(value.into_sync())
    }
}

/* -------------------------------------------------------------------------- */
/* r2d2::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl From<r2d2::Error> for InfraError {
    fn from(value: r2d2::Error) -> Self {
        InfraError(SyncError::Persistence(format!("connection pool error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* reqwest::Error → SyncError */
/* -------------------------------------------------------------------------- */

impl IntoSyncError for HttpError {
    fn into_sync(self) -> SyncError {
        if self.is_timeout() {
            return SyncError::Network("HTTP request timed out".into());
        }

        if self.is_connect() {
            return SyncError::Network(format!("HTTP connection failure: {self}"));
        }

        if self.is_builder() {
            return SyncError::Internal(format!("invalid HTTP request: {self}"));
        }

        SyncError::Network(self.to_string())
    }
}

impl From<HttpError> for InfraError {
    fn from(value: HttpError) -> Self {
        InfraError(value.into_sync())
    }
}

/* -------------------------------------------------------------------------- */
/* Config file formats and I/O → SyncError */
/* -------------------------------------------------------------------------- */

impl From<serde_json::Error> for InfraError {
    fn from(value: serde_json::Error) -> Self {
        InfraError(SyncError::Config(format!("invalid JSON: {value}")))
    }
}

impl From<toml::de::Error> for InfraError {
    fn from(value: toml::de::Error) -> Self {
        InfraError(SyncError::Config(format!("invalid TOML: {value}")))
    }
}

impl From<IoError> for InfraError {
    fn from(value: IoError) -> Self {
        InfraError(SyncError::Config(format!("I/O error: {value}")))
    }
}

/* -------------------------------------------------------------------------- */
/* Tests */
/* -------------------------------------------------------------------------- */
