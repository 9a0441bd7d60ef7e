//! Core error types for smart-boiler-core.
//!
//! None of these are fatal to the process. Reactors degrade to "do nothing
//! this cycle" on every variant; the types exist so that callers and logs can
//! say *why* nothing happened.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for smart-boiler-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// An external signal could not be read as a number
    #[error("Signal error: {0}")]
    Signal(#[from] SignalError),

    /// Threshold store errors
    #[error("Threshold error: {0}")]
    Threshold(#[from] ThresholdError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic errors with context
    #[error("{0}")]
    Custom(String),
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

    /// Migration failed
    #[error("Database migration failed: {0}")]
    MigrationFailed(String),

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

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Failed to locate the data directory
    #[error("Failed to access data directory: {0}")]
    DataDir(String),
}

/// Failure of the parse-and-validate step applied to every external value.
///
/// `Missing` and `Unavailable` are the MissingSignal case, `Unparsable` is the
/// UnparsableValue case. Both are soft misses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SignalError {
    #[error("entity '{key}' is not present")]
    Missing { key: String },

    #[error("entity '{key}' reports '{sentinel}'")]
    Unavailable { key: String, sentinel: String },

    #[error("entity '{key}' has non-numeric value '{raw}'")]
    Unparsable { key: String, raw: String },
}

/// Threshold store errors.
#[derive(Error, Debug)]
pub enum ThresholdError {
    /// Adjustment requested before the store restored a value
    #[error("threshold store '{key}' has not been initialized")]
    NotInitialized { key: String },

    /// Value rejected by the store bounds
    #[error("threshold value {value} is outside [{min}, {max}]")]
    OutOfRange { value: f64, min: f64, max: f64 },

    /// Backing store failed
    #[error("threshold persistence failed: {0}")]
    Persistence(String),
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

impl From<DatabaseError> for ThresholdError {
    fn from(err: DatabaseError) -> Self {
        ThresholdError::Persistence(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
