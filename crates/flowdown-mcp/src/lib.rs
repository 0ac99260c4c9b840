//! MCP connection lifecycle for FlowDown.
//!
//! [`McpService`] keeps the set of live connections in step with the set of
//! enabled servers, negotiates capabilities, and writes connection status
//! back through the repository port. Transports ([`StdioClient`],
//! [`HttpClient`]) speak JSON-RPC 2.0 and are created through
//! [`DefaultClientFactory`].

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

pub mod client;
pub mod connection;
pub mod executor;
pub mod observable;
pub(crate) mod path;
pub mod service;

// Re-export domain types from core for convenience
pub use flowdown_core::{
    ConnectionStatus, McpEnvEntry, McpServer, McpServerConfig, McpServerType, McpTool,
    McpToolResult, NewMcpServer,
};

pub use client::{DefaultClientFactory, HttpClient, StdioClient};
pub use connection::McpConnection;
pub use executor::SerialExecutor;
pub use observable::Observable;
pub use service::{ConnectionTable, McpService, McpServiceOptions};

// Dev-dependencies used only by integration tests
#[cfg(test)]
use flowdown_db as _;
