//! Error types for the runner module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for runner operations.
pub type RunnerResult<T> = Result<T, RunnerError>;

/// Errors that can occur during runner operations.
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("Test engine not available: {0}")]
    EngineUnavailable(String),

    #[error("Test engine failed to start: {0}")]
    ExecutionFailed(String),

    #[error("State store error at {path}: {message}")]
    Store { path: PathBuf, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
