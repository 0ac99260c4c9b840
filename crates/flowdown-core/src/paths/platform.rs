//! Platform-specific path resolution.

use std::env;
use std::fs;
use std::path::PathBuf;

use super::error::PathError;

/// Environment variable that overrides the data root.
pub const DATA_DIR_ENV: &str = "FLOWDOWN_DATA_DIR";

/// Get the root directory for application data (database, config).
///
/// Resolution order:
/// 1. `FLOWDOWN_DATA_DIR` environment variable (highest priority)
/// 2. System data directory (e.g., `~/.local/share/flowdown`)
///
/// The directory is created if it does not exist yet.
pub fn data_root() -> Result<PathBuf, PathError> {
    let root = match env::var(DATA_DIR_ENV) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path),
        _ => dirs::data_local_dir()
            .ok_or(PathError::NoDataDir)?
            .join("flowdown"),
    };

    if !root.exists() {
        fs::create_dir_all(&root).map_err(|e| PathError::CreateFailed {
            path: root.clone(),
            reason: e.to_string(),
        })?;
    }

    if !root.is_dir() {
        return Err(PathError::NotADirectory(root));
    }

    Ok(root)
}
