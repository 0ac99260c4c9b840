//! Path utilities for FlowDown data directories.
//!
//! This module provides the canonical path resolution for all components:
//! - Application data root
//! - Database location
//!
//! # Design
//!
//! - Returns `PathBuf` and `PathError` for clear error handling
//! - No interactive/terminal I/O - adapters handle user prompts separately
//! - OS-specific logic is kept private in `platform`

mod database;
mod error;
mod platform;

#[cfg(test)]
mod test_utils;

pub use database::database_path;
pub use error::PathError;
pub use platform::{DATA_DIR_ENV, data_root};
