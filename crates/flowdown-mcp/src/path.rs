//! Executable resolution and child-process `PATH` for stdio servers.
//!
//! Commands are stored the way the user typed them (`npx`, `uvx`,
//! `/usr/local/bin/server`). Before spawning, bare names are resolved against
//! `PATH`, the result is checked, and the child gets a `PATH` that also
//! contains the executable's own directory so shebang interpreters resolve.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Default paths to include on macOS when PATH is limited (bundled apps)
#[cfg(target_os = "macos")]
const MACOS_DEFAULT_PATHS: &[&str] = &[
    "/opt/homebrew/bin",
    "/usr/local/bin",
    "/usr/bin",
    "/bin",
    "/usr/sbin",
    "/sbin",
];

/// Resolve `command` to an absolute executable path.
///
/// Absolute commands are only validated; bare names go through `which`.
pub fn resolve_command(command: &str) -> Result<PathBuf, String> {
    let path = Path::new(command);
    let resolved = if path.is_absolute() {
        path.to_path_buf()
    } else {
        which::which(command).map_err(|e| format!("Cannot find '{command}' on PATH: {e}"))?
    };

    validate_exe_path(&resolved)?;
    Ok(resolved)
}

/// Check that `exe_path` is an absolute path to an existing executable file.
pub fn validate_exe_path(exe_path: &Path) -> Result<(), String> {
    let shown = exe_path.display();

    if !exe_path.is_absolute() {
        return Err(format!("Executable path must be absolute: {shown}"));
    }

    if !exe_path.exists() {
        return Err(format!("Executable not found: {shown}"));
    }

    if !exe_path.is_file() {
        return Err(format!("Executable path is not a file: {shown}"));
    }

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let metadata =
            std::fs::metadata(exe_path).map_err(|e| format!("Failed to check permissions: {e}"))?;
        if metadata.permissions().mode() & 0o111 == 0 {
            return Err(format!("File is not executable: {shown}"));
        }
    }

    Ok(())
}

/// Check that `cwd` exists and is a directory.
pub fn validate_working_dir(cwd: &str) -> Result<(), String> {
    let path = Path::new(cwd);

    if !path.exists() {
        return Err(format!("Working directory does not exist: {cwd}"));
    }

    if !path.is_dir() {
        return Err(format!("Working directory path is not a directory: {cwd}"));
    }

    Ok(())
}

/// Build the `PATH` handed to the child process.
///
/// Order: the executable's directory, the current `PATH`, then platform
/// defaults. Duplicates keep their first position.
pub fn build_effective_path(exe_path: &Path) -> OsString {
    let mut entries: Vec<PathBuf> = Vec::new();

    if let Some(exe_dir) = exe_path.parent() {
        entries.push(exe_dir.to_path_buf());
    }

    if let Some(current) = env::var_os("PATH") {
        entries.extend(env::split_paths(&current));
    }

    #[cfg(target_os = "macos")]
    entries.extend(MACOS_DEFAULT_PATHS.iter().map(PathBuf::from));

    let mut seen = std::collections::HashSet::new();
    entries.retain(|entry| !entry.as_os_str().is_empty() && seen.insert(entry.clone()));

    env::join_paths(entries).unwrap_or_else(|_| env::var_os("PATH").unwrap_or_default())
}
