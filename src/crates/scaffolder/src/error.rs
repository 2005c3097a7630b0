//! Error types for scaffolder actions

use scaffolder_checkpoint::CheckpointError;
use thiserror::Error;
use utils::UtilsError;

/// Result type for scaffolder operations
pub type Result<T> = std::result::Result<T, ScaffolderError>;

#[derive(Debug, Error)]
pub enum ScaffolderError {
    /// The action input or repo URL is unusable
    #[error("Invalid input: {0}")]
    Input(String),

    /// Integration or app config is missing something the action needs
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provider API refused or failed the request
    #[error("{0}")]
    Provider(String),

    #[error("Git error: {0}")]
    Git(String),

    #[error("Action not found: {0}")]
    ActionNotFound(String),

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),

    #[error(transparent)]
    Http(#[from] UtilsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ScaffolderError {
    /// Whether the error comes from bad caller input rather than a failed step
    pub fn is_input_error(&self) -> bool {
        matches!(self, ScaffolderError::Input(_))
    }
}

impl From<git2::Error> for ScaffolderError {
    fn from(err: git2::Error) -> Self {
        ScaffolderError::Git(err.message().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checkpoint_error_is_transparent() {
        let err: ScaffolderError = CheckpointError::store("disk full").into();
        assert!(matches!(err, ScaffolderError::Checkpoint(_)));
        assert_eq!(err.to_string(), CheckpointError::store("disk full").to_string());
    }

    #[test]
    fn test_provider_message_is_verbatim() {
        let err = ScaffolderError::Provider("Unable to create repository, 400 Bad Request, {}".into());
        assert_eq!(err.to_string(), "Unable to create repository, 400 Bad Request, {}");
        assert!(!err.is_input_error());
    }

    #[test]
    fn test_git_error_conversion() {
        let err: ScaffolderError = git2::Error::from_str("remote rejected").into();
        assert_eq!(err.to_string(), "Git error: remote rejected");
    }
}
