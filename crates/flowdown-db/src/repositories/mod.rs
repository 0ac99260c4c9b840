//! `SQLite` implementations of the core repository ports.
//!
//! Queries stay in this module; callers only see the port traits.

mod sqlite_mcp_repository;
mod sqlite_settings_repository;

pub use sqlite_mcp_repository::SqliteMcpRepository;
pub use sqlite_settings_repository::SqliteSettingsRepository;
