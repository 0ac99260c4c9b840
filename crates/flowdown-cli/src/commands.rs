//! Top-level commands.

use clap::Subcommand;

use crate::config_commands::ConfigCommand;
use crate::mcp_commands::McpCommand;

/// Available commands for the `flowdown` tool.
#[derive(Subcommand)]
pub enum Commands {
    /// Show resolved data and database paths
    Paths,

    /// Manage MCP servers and their connections
    Mcp {
        #[command(subcommand)]
        command: McpCommand,
    },

    /// View or change application settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}
