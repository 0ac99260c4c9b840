//! Remote MCP client port.
//!
//! The service talks to MCP servers only through these traits, so transports
//! live in `flowdown-mcp` and tests substitute in-memory fakes.

use std::collections::HashMap;

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::mcp::{McpServer, McpTool, McpToolResult};

/// Errors that can occur during MCP client operations.
#[derive(Debug, Error)]
pub enum McpClientError {
    #[error("Failed to spawn MCP server process: {0}")]
    SpawnFailed(String),

    #[error("Failed to communicate with MCP server: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("Timeout waiting for MCP server response")]
    Timeout,

    #[error("MCP server returned error: code={code}, message={message}")]
    Server { code: i64, message: String },

    #[error("HTTP transport error: {0}")]
    Http(String),

    #[error("Server not connected")]
    NotConnected,

    #[error("Invalid client configuration: {0}")]
    InvalidConfig(String),
}

/// A client handle for one MCP server.
///
/// `connect` must be idempotent: calling it on a connected client is a no-op.
#[async_trait]
pub trait McpClientPort: Send + Sync {
    /// Establish the session (spawn/handshake for stdio, initialize for HTTP).
    async fn connect(&mut self) -> Result<(), McpClientError>;

    /// Tear the session down. Safe to call when already disconnected.
    async fn disconnect(&mut self);

    /// Whether a live session exists.
    fn is_connected(&self) -> bool;

    /// List the tools the server exposes.
    async fn list_tools(&self) -> Result<Vec<McpTool>, McpClientError>;

    /// Invoke a tool by name.
    async fn call_tool(
        &self,
        name: &str,
        arguments: HashMap<String, serde_json::Value>,
    ) -> Result<McpToolResult, McpClientError>;
}

/// Builds unconnected clients for a server configuration.
pub trait McpClientFactory: Send + Sync {
    /// Create a client for `server`. Does not connect.
    fn create(&self, server: &McpServer) -> Result<Box<dyn McpClientPort>, McpClientError>;
}
