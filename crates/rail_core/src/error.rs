//! Error types for the core module.

use rail_api::ApiError;
use rail_manifest::ManifestError;
use rail_runner::RunnerError;
use thiserror::Error;

/// Result type alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur while resolving railway progress.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Railway manifest unavailable: {0}")]
    ManifestUnavailable(#[from] ManifestError),

    #[error("Failed to fetch railway {railway_id}: {source}")]
    RemoteFetchFailed {
        railway_id: u64,
        #[source]
        source: ApiError,
    },

    #[error("Railway has not been loaded")]
    NotInitialized,

    #[error("Runner error: {0}")]
    Runner(#[from] RunnerError),
}

impl CoreError {
    /// Whether retrying later may succeed without local changes.
    pub fn is_transient(&self) -> bool {
        matches!(self, CoreError::RemoteFetchFailed { .. })
    }
}
