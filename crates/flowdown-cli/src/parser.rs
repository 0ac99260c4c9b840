//! Main CLI parser and top-level argument handling.
//!
//! This module defines the root CLI structure with global options.

use std::path::PathBuf;

use clap::Parser;

use crate::commands::Commands;

/// Command-line interface for FlowDown's MCP server management.
#[derive(Parser)]
#[command(name = "flowdown")]
#[command(about = "Manage and test FlowDown MCP servers")]
#[command(version)]
pub struct Cli {
    /// Use this database file instead of the default location
    #[arg(long = "database", global = true, env = "FLOWDOWN_DATABASE")]
    pub database: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}
