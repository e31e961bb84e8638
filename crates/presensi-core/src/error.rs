//! Core error types for presensi-core.
//!
//! Transition failures are ordinary values: the state machines reject an
//! invalid action and leave the stored state untouched. Only store and
//! configuration problems escalate past the caller.

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for presensi-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Record-store errors
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A rejected state transition
    #[error("{0}")]
    Transition(#[from] TransitionError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Record-store errors. Any of these aborts the transition with no
/// partial state change.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to open the store
    #[error("Failed to open store at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Store is locked by another writer
    #[error("Store is locked")]
    Locked,
}

/// Configuration-specific errors. Raised once at load time; transitions
/// themselves never fail on configuration.
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
}

/// A rejected attendance or break transition.
///
/// These are the only failures an inbound action can produce on valid
/// input; the caller decides the user-facing messaging.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransitionError {
    /// Today's record already has a check-in
    #[error("Already checked in today at {at}")]
    AlreadyCheckedIn { at: chrono::DateTime<chrono::Utc> },

    /// Today's record already has a check-out
    #[error("Already checked out today")]
    AlreadyCheckedOut,

    /// Check-out requires a prior check-in
    #[error("No check-in recorded today")]
    NoCheckInYet,

    /// Starting a break requires a prior check-in
    #[error("Not checked in today")]
    NotCheckedIn,

    /// At most one open break per employee
    #[error("A '{break_type}' break is already active (since {since})")]
    BreakAlreadyActive {
        break_type: String,
        since: chrono::DateTime<chrono::Utc>,
    },

    /// Ending a break requires an open one
    #[error("No active break")]
    NoActiveBreak,
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(err, _msg) => {
                if err.code == rusqlite::ErrorCode::DatabaseLocked {
                    StoreError::Locked
                } else {
                    StoreError::QueryFailed(err.to_string())
                }
            }
            _ => StoreError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Store(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
