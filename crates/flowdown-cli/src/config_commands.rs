//! Settings subcommands.

use clap::Subcommand;

/// Configuration management commands.
#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Show all current settings
    Show,
    /// Set one setting; an empty value resets it to the default
    Set {
        /// Setting name (mcp_connect_timeout_secs, mcp_request_timeout_secs, prepare_on_launch)
        key: String,
        /// New value
        value: String,
    },
}
