//! Error types shared across the daemon

use serde::Serialize;
use thiserror::Error;

/// Reasons a `create` or `edit` command is refused. The store is left untouched.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ValidationError {
    #[error("timer name must not be empty")]
    EmptyName,
    #[error("timer duration must be a positive number of seconds")]
    NonPositiveDuration,
    #[error("no timer ids are left to allocate")]
    IdsExhausted,
}

/// Failures of the key-value medium itself
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("storage file is not a key-value document: {0}")]
    Format(#[from] serde_json::Error),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// Failures of loading or saving the timer collection
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("failed to read persisted timers: {0}")]
    Read(#[source] StorageError),

    /// The blob exists but cannot be turned back into a timer collection.
    #[error("persisted timers are corrupt: {0}")]
    CorruptState(String),

    #[error("failed to encode timers: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("failed to write timers: {0}")]
    Write(#[source] StorageError),
}

impl PersistenceError {
    pub fn is_corrupt(&self) -> bool {
        matches!(self, PersistenceError::CorruptState(_))
    }
}

/// Failures of a command issued against the shared application state
#[derive(Error, Debug)]
pub enum CommandError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    /// A lock was poisoned by a panicking holder.
    #[error("{0}")]
    Poisoned(String),
}
