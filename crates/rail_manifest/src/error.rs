//! Error types for the manifest module.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

/// Errors that can occur while reading manifests.
#[derive(Error, Debug)]
pub enum ManifestError {
    #[error("Manifest not found: {0}")]
    NotFound(PathBuf),

    #[error("Invalid manifest {path}: {message}")]
    InvalidFormat { path: PathBuf, message: String },

    #[error("No manifest entry for station order {0}")]
    StationNotMapped(u32),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
