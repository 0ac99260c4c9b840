//! Core domain types, ports and settings for FlowDown's MCP connection service.
//!
//! This crate holds no infrastructure: storage lives in `flowdown-db`, MCP
//! transports and the connection service live in `flowdown-mcp`.

#![deny(unused_crate_dependencies)]

pub mod domain;
pub mod paths;
pub mod ports;
pub mod services;
pub mod settings;

// Re-export commonly used types for convenience
pub use domain::{
    ConnectionParams, ConnectionStatus, McpEnvEntry, McpServer, McpServerConfig, McpServerType,
    McpTool, McpToolResult, NewMcpServer, TOOLS_CAPABILITY,
};
pub use paths::{DATA_DIR_ENV, PathError, data_root, database_path};
pub use ports::{
    CoreError, McpClientError, McpClientFactory, McpClientPort, McpErrorCategory, McpErrorInfo,
    McpRepositoryError, McpServerEdit, McpServerRepository, McpServiceError, Repos,
    RepositoryError, SettingsRepository,
};
pub use services::SettingsService;
pub use settings::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_REQUEST_TIMEOUT_SECS, Settings, SettingsError,
    SettingsUpdate, validate_settings,
};
