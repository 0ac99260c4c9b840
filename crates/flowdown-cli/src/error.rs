//! CLI-specific error types and mappings.
//!
//! Maps core and service errors to exit codes and user-facing messages.

use flowdown_core::{CoreError, McpRepositoryError, McpServiceError};
use thiserror::Error;

/// CLI-specific error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Core domain error.
    #[error("{0}")]
    Core(String),

    /// Argument parsing error.
    #[error("Invalid arguments: {0}")]
    Arguments(String),

    /// IO error (file not found, permission denied, etc.).
    #[error("IO error: {0}")]
    Io(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// The server could not be reached or misbehaved.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The referenced server does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl CliError {
    /// Map error to appropriate exit code.
    ///
    /// Exit codes follow Unix conventions:
    /// - 0: Success
    /// - 1: General error
    /// - 2: Misuse of shell command (invalid arguments)
    /// - 64-78: Reserved for specific error categories (see sysexits.h)
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Core(_) => 1,
            Self::Arguments(_) => 2,  // EX_USAGE
            Self::NotFound(_) => 66,  // EX_NOINPUT
            Self::Connection(_) => 69, // EX_UNAVAILABLE
            Self::Database(_) => 73,  // EX_CANTCREAT (closest fit)
            Self::Io(_) => 74,        // EX_IOERR
            Self::Config(_) => 78,    // EX_CONFIG
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Repository(repo_err) => Self::Database(repo_err.to_string()),
            CoreError::Settings(settings_err) => Self::Config(settings_err.to_string()),
            CoreError::Validation(msg) => Self::Arguments(msg),
            CoreError::Internal(msg) => Self::Core(msg),
        }
    }
}

impl From<McpServiceError> for CliError {
    fn from(err: McpServiceError) -> Self {
        match err {
            McpServiceError::Repository(McpRepositoryError::NotFound(what)) => {
                Self::NotFound(format!("MCP server {what}"))
            }
            McpServiceError::Repository(McpRepositoryError::Conflict(name)) => {
                Self::Arguments(format!("an MCP server named '{name}' already exists"))
            }
            McpServiceError::Repository(e) => Self::Database(e.to_string()),
            McpServiceError::InvalidConfig(msg) => Self::Config(msg),
            McpServiceError::Internal(msg) => Self::Core(msg),
            other @ (McpServiceError::Client(_)
            | McpServiceError::ConnectionFailed(_)
            | McpServiceError::Timeout { .. }
            | McpServiceError::NotConnected(_)) => Self::Connection(other.to_string()),
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowdown_core::McpClientError;

    #[test]
    fn test_service_errors_map_to_exit_codes() {
        let missing: CliError =
            McpServiceError::Repository(McpRepositoryError::NotFound("id=4".into())).into();
        assert_eq!(missing.exit_code(), 66);
        assert_eq!(missing.to_string(), "Not found: MCP server id=4");

        let timeout: CliError = McpServiceError::Timeout {
            server_id: 4,
            secs: 30,
        }
        .into();
        assert_eq!(timeout.exit_code(), 69);

        let client: CliError = McpServiceError::Client(McpClientError::NotConnected).into();
        assert!(matches!(client, CliError::Connection(_)));

        let conflict: CliError =
            McpServiceError::Repository(McpRepositoryError::Conflict("files".into())).into();
        assert_eq!(conflict.exit_code(), 2);
    }
}
