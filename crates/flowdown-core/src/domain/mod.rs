//! Core domain types.
//!
//! These types represent the pure domain model, independent of any
//! infrastructure concerns (database, filesystem, etc.).

pub mod mcp;

pub use mcp::{
    ConnectionParams, ConnectionStatus, McpEnvEntry, McpServer, McpServerConfig, McpServerType,
    McpTool, McpToolResult, NewMcpServer, TOOLS_CAPABILITY,
};
