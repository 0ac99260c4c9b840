//! MCP service error types.
//!
//! This module defines service-level errors for MCP operations.

use thiserror::Error;

use super::{McpClientError, McpRepositoryError};

/// Domain-specific errors for MCP service operations.
///
/// This error type wraps repository and client errors and adds service-level
/// failure modes.
#[derive(Debug, Error)]
pub enum McpServiceError {
    /// Repository operation failed.
    #[error(transparent)]
    Repository(#[from] McpRepositoryError),

    /// Transport-layer error bubbled up from the client.
    #[error(transparent)]
    Client(#[from] McpClientError),

    /// The referenced server is missing or its configuration is unusable.
    #[error("Invalid MCP configuration: {0}")]
    InvalidConfig(String),

    /// Connect returned but no live client handle is available.
    #[error("MCP connection failed: {0}")]
    ConnectionFailed(String),

    /// Connect did not finish within the configured timeout.
    #[error("Timed out after {secs}s connecting to MCP server {server_id}")]
    Timeout { server_id: i64, secs: u64 },

    /// Operation needs a live connection that does not exist.
    #[error("MCP server not connected: {0}")]
    NotConnected(i64),

    /// Internal service error.
    #[error("Internal MCP error: {0}")]
    Internal(String),
}

/// User-safe error information for presenting MCP failures.
///
/// Used by callers of the test-connection callback to render a message
/// without matching on every error variant.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct McpErrorInfo {
    /// ID of the MCP server (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_id: Option<i64>,

    /// User-friendly error message.
    pub message: String,

    /// Error category for UI handling.
    pub category: McpErrorCategory,
}

/// Categories of MCP errors for UI handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum McpErrorCategory {
    /// Connection lifecycle error.
    Connection,
    /// Protocol communication error.
    Protocol,
    /// Configuration error.
    Configuration,
    /// Unknown/internal error.
    Unknown,
}

impl McpErrorInfo {
    /// Build error info from a service error.
    pub fn from_error(server_id: Option<i64>, error: &McpServiceError) -> Self {
        Self {
            server_id,
            message: error.to_string(),
            category: McpErrorCategory::from(error),
        }
    }
}

impl From<&McpServiceError> for McpErrorCategory {
    fn from(error: &McpServiceError) -> Self {
        match error {
            McpServiceError::Repository(_) | McpServiceError::Internal(_) => Self::Unknown,
            McpServiceError::ConnectionFailed(_)
            | McpServiceError::Timeout { .. }
            | McpServiceError::NotConnected(_) => Self::Connection,
            McpServiceError::InvalidConfig(_) => Self::Configuration,
            McpServiceError::Client(client) => match client {
                McpClientError::SpawnFailed(_)
                | McpClientError::Io(_)
                | McpClientError::Timeout
                | McpClientError::Http(_)
                | McpClientError::NotConnected => Self::Connection,
                McpClientError::Json(_)
                | McpClientError::Protocol(_)
                | McpClientError::Server { .. } => Self::Protocol,
                McpClientError::InvalidConfig(_) => Self::Configuration,
            },
        }
    }
}
