//! Command handlers that delegate to the MCP and settings services.
//!
//! Handlers follow the canonical pattern:
//! - Signature: `pub async fn execute(ctx: &CliContext, ...) -> Result<()>`
//! - Thin wrappers that call a service and format output for the terminal
//!
//! Handlers should NOT access repositories directly or manage database
//! connections.

pub mod config;
pub mod mcp;
pub mod paths;
