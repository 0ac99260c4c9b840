//! `flowdown` command-line interface.
//!
//! Manages MCP server configurations stored in the FlowDown database and
//! drives the connection service for testing servers, listing their tools,
//! and calling them.

#![deny(unsafe_code)]
#![deny(unused_crate_dependencies)]

// Used by the binary target only
use dotenvy as _;
use tracing_subscriber as _;

pub mod bootstrap;
pub mod commands;
pub mod config_commands;
pub mod error;
pub mod handlers;
pub mod mcp_commands;
pub mod parser;
pub mod presentation;

// Re-export primary types for convenient access
pub use bootstrap::{CliConfig, CliContext, bootstrap};
pub use commands::Commands;
pub use config_commands::ConfigCommand;
pub use error::CliError;
pub use mcp_commands::McpCommand;
pub use parser::Cli;
