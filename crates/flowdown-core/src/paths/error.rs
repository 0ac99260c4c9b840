//! Errors from resolving the FlowDown data directory.

use std::path::PathBuf;
use thiserror::Error;

/// Failure to locate or prepare the data root or the database directory.
#[derive(Debug, Error)]
pub enum PathError {
    /// Neither `FLOWDOWN_DATA_DIR` nor a platform data directory is available.
    #[error("Cannot determine a data directory; set FLOWDOWN_DATA_DIR")]
    NoDataDir,

    /// The data root exists but is a file.
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    #[error("Failed to create directory {path}: {reason}")]
    CreateFailed { path: PathBuf, reason: String },
}
