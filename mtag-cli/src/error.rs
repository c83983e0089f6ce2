//! Error types for library scanning, tag I/O and commands

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using mtag-cli's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Library folder scanning errors
#[derive(Debug, Error)]
pub enum ScanError {
    /// Specified path does not exist
    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    /// Path exists but is not a directory
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// No library folders configured or given on the command line
    #[error("No library paths configured")]
    NoPaths,
}

/// Errors raised by the mtag tool
#[derive(Debug, Error)]
pub enum Error {
    #[error("Scan error: {0}")]
    Scan(#[from] ScanError),

    #[error("Tag error for {path}: {source}")]
    Tag {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Common(#[from] mtag_common::Error),
}

impl Error {
    pub fn tag(path: impl Into<PathBuf>, source: lofty::error::LoftyError) -> Self {
        Error::Tag {
            path: path.into(),
            source,
        }
    }
}
