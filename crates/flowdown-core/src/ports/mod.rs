//! Traits the MCP service and settings service depend on.
//!
//! Storage and transports implement these in `flowdown-db` and
//! `flowdown-mcp`. Signatures use domain types only, never `sqlx` or
//! process/network types; clients come from a factory so the service never
//! names a transport.

pub mod mcp_client;
pub mod mcp_error;
pub mod mcp_repository;
pub mod settings_repository;

use std::sync::Arc;
use thiserror::Error;

pub use mcp_client::{McpClientError, McpClientFactory, McpClientPort};
pub use mcp_error::{McpErrorCategory, McpErrorInfo, McpServiceError};
pub use mcp_repository::{McpRepositoryError, McpServerEdit, McpServerRepository};
pub use settings_repository::SettingsRepository;

/// The repositories a composition root hands to services.
#[derive(Clone)]
pub struct Repos {
    pub settings: Arc<dyn SettingsRepository>,
    /// Server configurations plus connection bookkeeping.
    pub mcp_servers: Arc<dyn McpServerRepository>,
}

impl Repos {
    pub fn new(
        settings: Arc<dyn SettingsRepository>,
        mcp_servers: Arc<dyn McpServerRepository>,
    ) -> Self {
        Self {
            settings,
            mcp_servers,
        }
    }
}

/// Storage failure for non-MCP repositories, with backend details flattened to text.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The requested entity was not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Storage backend error (database, filesystem, etc.).
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Error type of [`crate::SettingsService`]; the CLI maps it to exit codes.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    /// Settings validation error.
    #[error(transparent)]
    Settings(#[from] crate::settings::SettingsError),

    /// Validation error (invalid input).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Internal error (unexpected condition).
    #[error("Internal error: {0}")]
    Internal(String),
}
