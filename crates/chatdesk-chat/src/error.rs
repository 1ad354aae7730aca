//! Error types for the conversation engine.

/// Errors from the chat engine.
///
/// Only startup can fail: steady-state operations degrade to default state
/// and log instead of returning errors.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("response table error: {0}")]
    ResponseTable(String),
    #[error("runtime error: {0}")]
    Runtime(String),
}
