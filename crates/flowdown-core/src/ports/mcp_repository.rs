//! MCP server repository trait and error types.
//!
//! This module defines the persistence gateway for MCP server configurations.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::mcp::{McpServer, NewMcpServer};

/// In-place mutation applied by [`McpServerRepository::edit`].
pub type McpServerEdit = Box<dyn FnOnce(&mut McpServer) + Send>;

/// Domain-specific errors for MCP repository operations.
///
/// This error type abstracts away storage implementation details and provides
/// a clean interface for services to handle MCP storage failures.
#[derive(Debug, Error)]
pub enum McpRepositoryError {
    /// The requested MCP server was not found.
    #[error("MCP server not found: {0}")]
    NotFound(String),

    /// An MCP server with the same name already exists.
    #[error("MCP server already exists: {0}")]
    Conflict(String),

    /// Storage backend error (database, etc.).
    #[error("Storage error: {0}")]
    Internal(String),
}

/// Repository trait for MCP server persistence.
///
/// Every method returns value snapshots; callers never hold references into
/// storage.
///
/// # Design Rules
///
/// - Environment variables are embedded in `McpServer` - no separate env API
/// - `update()` replaces the entire server including env atomically
/// - `edit()` is the read-modify-write path used for status bookkeeping
/// - Constraint: unique `name` across all servers
///
/// # Example
///
/// ```ignore
/// let server = repo.insert(NewMcpServer::new_http("remote", "https://example.com/mcp")).await?;
///
/// repo.edit(server.id, Box::new(|s| s.enabled = false)).await?;
///
/// let all = repo.list().await?;
/// ```
#[async_trait]
pub trait McpServerRepository: Send + Sync {
    /// Insert a new MCP server.
    ///
    /// Returns the server with its assigned ID and timestamps. New servers
    /// always start `Disconnected` with no capabilities.
    ///
    /// # Errors
    ///
    /// - `Conflict` if a server with the same name already exists
    /// - `Internal` for storage errors
    async fn insert(&self, server: NewMcpServer) -> Result<McpServer, McpRepositoryError>;

    /// Get an MCP server by its database ID.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no server with the given ID exists
    /// - `Internal` for storage errors
    async fn get(&self, id: i64) -> Result<McpServer, McpRepositoryError>;

    /// List all MCP servers, ordered by name.
    ///
    /// # Errors
    ///
    /// - `Internal` for storage errors
    async fn list(&self) -> Result<Vec<McpServer>, McpRepositoryError>;

    /// Replace an existing MCP server.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no server with the given ID exists
    /// - `Conflict` if the new name conflicts with another server
    /// - `Internal` for storage errors
    async fn update(&self, server: &McpServer) -> Result<(), McpRepositoryError>;

    /// Delete an MCP server by its database ID.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no server with the given ID exists
    /// - `Internal` for storage errors
    async fn remove(&self, id: i64) -> Result<(), McpRepositoryError>;

    /// Re-read a server, apply `edit` in place, and write it back.
    ///
    /// Returns the stored result. The ID is preserved even if `edit` touches it.
    ///
    /// # Errors
    ///
    /// - `NotFound` if no server with the given ID exists
    /// - `Conflict` if the edit renames onto an existing name
    /// - `Internal` for storage errors
    async fn edit(&self, id: i64, edit: McpServerEdit) -> Result<McpServer, McpRepositoryError>;
}
