use thiserror::Error;

/// Top-level error type for Chatdesk.
///
/// Storage backends report failures with it; subsystem crates keep their own
/// error types for their startup failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ChatdeskError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for ChatdeskError {
    fn from(err: toml::de::Error) -> Self {
        ChatdeskError::Config(err.to_string())
    }
}

/// A specialized `Result` type for Chatdesk operations.
pub type Result<T> = std::result::Result<T, ChatdeskError>;
