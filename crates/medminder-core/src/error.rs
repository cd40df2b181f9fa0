//! Core error types for medminder-core.
//!
//! Every failure the library can report is a variant of [`CoreError`] or one
//! of its nested enums. None of them are fatal: callers turn remote errors
//! into a message for the user and log alarm/notification errors.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for medminder-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Remote backend errors
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Alarm registration errors
    #[error("Alarm error: {0}")]
    Alarm(#[from] AlarmError),

    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

/// Errors returned by the remote health backend.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// Transport-level failure
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Non-success HTTP status with the server's message
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Response body did not have the expected shape
    #[error("Unexpected response: {0}")]
    Decode(String),

    /// Operation needs a signed-in user
    #[error("Not signed in")]
    AuthRequired,

    /// Requested row does not exist
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    /// Backend URL could not be parsed
    #[error("Invalid backend URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors raised while registering or cancelling an alarm.
#[derive(Error, Debug)]
pub enum AlarmError {
    /// A stored time could not be parsed
    #[error("Invalid {field} '{value}'")]
    InvalidTime { field: &'static str, value: String },

    /// The platform refused to schedule (e.g. exact alarms not permitted)
    #[error("Alarm permission denied: {0}")]
    PermissionDenied(String),

    /// The alarm registry failed
    #[error("Alarm registry error: {0}")]
    Registry(String),
}

/// Errors raised by a notifier.
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The user has not granted notification permission
    #[error("Notification permission denied")]
    PermissionDenied,

    /// The notification surface is unavailable
    #[error("Notifications unavailable: {0}")]
    Unavailable(String),
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Home/config directory unavailable
    #[error("Config directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Required field left empty
    #[error("'{0}' must not be empty")]
    EmptyField(&'static str),

    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Appointment status change out of a terminal state
    #[error("Appointment is already {0}")]
    TerminalStatus(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    DatabaseError::Locked
                } else {
                    DatabaseError::QueryFailed(err.to_string())
                }
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for AlarmError {
    fn from(err: rusqlite::Error) -> Self {
        AlarmError::Registry(DatabaseError::from(err).to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locked_database_is_distinguished() {
        let locked = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
            None,
        );
        assert!(matches!(DatabaseError::from(locked), DatabaseError::Locked));
    }

    #[test]
    fn registry_failure_becomes_alarm_error() {
        let err = AlarmError::from(rusqlite::Error::InvalidQuery);
        assert!(matches!(err, AlarmError::Registry(_)));
    }

    #[test]
    fn nested_errors_keep_their_message() {
        let err: CoreError = ConfigError::UnknownKey("display.theme".into()).into();
        assert_eq!(
            err.to_string(),
            "Configuration error: Unknown configuration key: display.theme"
        );
        let err: CoreError = RemoteError::AuthRequired.into();
        assert_eq!(err.to_string(), "Remote error: Not signed in");
    }
}
