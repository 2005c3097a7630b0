//! Error types for checkpoint operations

use thiserror::Error;

/// Result type for checkpoint operations
pub type Result<T> = std::result::Result<T, CheckpointError>;

/// Errors raised by the checkpoint layer itself.
///
/// Step functions keep their own error type; these variants only describe
/// failures of the bracketing around a step (key misuse, store access,
/// stored value decoding). Every one of them is fatal for the run.
#[derive(Error, Debug)]
pub enum CheckpointError {
    /// Empty or otherwise unusable checkpoint key or run id
    #[error("Invalid checkpoint key: {0}")]
    InvalidKey(String),

    /// A checkpoint call for the same key is already running in this run
    #[error("Checkpoint '{key}' is already executing in run '{run_id}'")]
    KeyInFlight { run_id: String, key: String },

    /// Store read or write failure
    #[error("Checkpoint store error: {0}")]
    Store(String),

    /// A result could not be encoded, or a stored value could not be decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CheckpointError {
    /// Create a new store error
    pub fn store(msg: impl Into<String>) -> Self {
        CheckpointError::Store(msg.into())
    }

    /// Check if this error came from the persistence layer
    pub fn is_store_error(&self) -> bool {
        matches!(self, CheckpointError::Store(_))
    }

    /// Check if this error signals caller misuse of the executor
    pub fn is_caller_misuse(&self) -> bool {
        matches!(
            self,
            CheckpointError::InvalidKey(_) | CheckpointError::KeyInFlight { .. }
        )
    }
}

impl From<sqlx::Error> for CheckpointError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut => CheckpointError::Store("Connection pool timed out".to_string()),
            sqlx::Error::PoolClosed => CheckpointError::Store("Connection pool is closed".to_string()),
            err => CheckpointError::Store(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for CheckpointError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        CheckpointError::Store(format!("Migration error: {}", err))
    }
}
