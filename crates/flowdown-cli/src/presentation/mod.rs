//! Shared CLI presentation utilities.
//!
//! Keep this module format-only: no domain transforms.

pub mod servers;
pub mod tables;

// Re-export commonly used items
pub use servers::{print_server_table, status_marker};
pub use tables::{format_optional, format_timestamp, print_separator, truncate_string};
