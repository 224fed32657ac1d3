//! Core error types for timerdeck-core.
//!
//! Validation errors are local and never change state. Storage errors are
//! caught at the persistence boundary and never roll back in-memory state.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for timerdeck-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Storage-related errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Lookup of a timer or group that does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
}

impl CoreError {
    pub fn timer_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: "timer",
            id: id.into(),
        }
    }

    pub fn group_not_found(id: impl Into<String>) -> Self {
        CoreError::NotFound {
            kind: "group",
            id: id.into(),
        }
    }
}

/// Storage-specific errors.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Failed to open the backing database
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

    /// Stored value could not be encoded or decoded
    #[error("Failed to encode value for '{key}': {message}")]
    Serialize { key: String, message: String },

    /// Backend refused the operation
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
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

    /// Dot-path does not name an existing key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// No home/config directory could be resolved
    #[error("Cannot resolve data directory: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Countdown length must be strictly positive
    #[error("Duration must be positive, got {value}s")]
    NonPositiveDuration { value: f64 },

    /// Countdown length beyond what a timer can represent
    #[error("Duration of {value}s exceeds the {max}s limit")]
    DurationTooLong { value: f64, max: f64 },

    /// Display names may not be blank
    #[error("'{field}' must not be empty")]
    EmptyName { field: &'static str },

    /// Start requested with nothing left on the clock
    #[error("Timer {timer_id} has no remaining time to run")]
    NothingToRun { timer_id: String },

    /// The fixed single-timer list cannot be renamed or deleted
    #[error("Group '{0}' is built in and cannot be changed")]
    BuiltInGroup(String),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StorageError::Locked
                } else {
                    StorageError::QueryFailed(err.to_string())
                }
            }
            _ => StorageError::QueryFailed(err.to_string()),
        }
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
