//! MCP (Model Context Protocol) server domain types.
//!
//! These types represent MCP servers in the system, independent of any
//! infrastructure concerns (database, process management, etc.).
//!
//! # Design
//!
//! - `McpServer` - A persisted MCP server with ID and connection bookkeeping
//! - `NewMcpServer` - An MCP server to be inserted (no ID yet)
//! - `McpServerConfig` - Transport parameters (command/args or URL/headers)
//! - `McpServerType` - Transport (stdio or HTTP)
//! - `ConnectionStatus` - Disconnected, connecting, connected
//! - `ConnectionParams` - The subset of a server that decides how to connect
//! - `McpTool` / `McpToolResult` - Tools exposed by a server and call results

mod types;

pub use types::{
    ConnectionParams, ConnectionStatus, McpEnvEntry, McpServer, McpServerConfig, McpServerType,
    McpTool, McpToolResult, NewMcpServer, TOOLS_CAPABILITY,
};
