//! Errors raised by the shared HTTP and config helpers.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, UtilsError>;

#[derive(Debug, Error)]
pub enum UtilsError {
    /// No usable response: connect failure, timeout, TLS or body read error.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The request could not be built or replayed for a retry.
    #[error("Invalid request: {0}")]
    Request(String),

    #[error("Environment variable '{0}' is not set")]
    MissingEnv(String),

    /// App-config is malformed or has an unexpected shape.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to decode {format}: {message}")]
    Decode { format: &'static str, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl UtilsError {
    /// Whether resending the same idempotent request might succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, UtilsError::Transport(e) if e.is_timeout() || e.is_connect())
    }
}

impl From<serde_json::Error> for UtilsError {
    fn from(err: serde_json::Error) -> Self {
        UtilsError::Decode {
            format: "JSON",
            message: err.to_string(),
        }
    }
}

impl From<serde_yaml::Error> for UtilsError {
    fn from(err: serde_yaml::Error) -> Self {
        UtilsError::Decode {
            format: "YAML",
            message: err.to_string(),
        }
    }
}
