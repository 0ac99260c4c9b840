//! Paths command handler.
//!
//! Displays resolved paths for diagnostics.

use std::path::Path;

use anyhow::Result;
use flowdown_core::{DATA_DIR_ENV, data_root, database_path};

/// Print resolved paths in `key = value` form.
///
/// `database_override` is the `--database` flag, which takes precedence
/// over the default database location.
pub fn execute(database_override: Option<&Path>) -> Result<()> {
    let root = data_root()?;
    let database = match database_override {
        Some(path) => path.to_path_buf(),
        None => database_path()?,
    };

    println!("data_root = {}", root.display());
    println!("database = {}", database.display());
    if let Ok(value) = std::env::var(DATA_DIR_ENV) {
        println!("{DATA_DIR_ENV} = {value}");
    }
    Ok(())
}
