//! Config command handler.

use anyhow::Result;
use flowdown_core::Settings;

use crate::bootstrap::CliContext;
use crate::config_commands::ConfigCommand;
use crate::error::CliError;

/// Execute the config command.
pub async fn execute(ctx: &CliContext, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let settings = ctx.settings().get().await.map_err(CliError::from)?;
            print_settings(&settings);
        }
        ConfigCommand::Set { key, value } => {
            ctx.settings()
                .set(&key, &value)
                .await
                .map_err(CliError::from)?;
            if value.trim().is_empty() {
                println!("✓ {key} reset to default");
            } else {
                println!("✓ {key} = {}", value.trim());
            }
            println!("  Takes effect the next time flowdown starts.");
        }
    }
    Ok(())
}

fn print_settings(settings: &Settings) {
    println!("Current settings:");
    println!(
        "  mcp_connect_timeout_secs = {}",
        settings.connect_timeout().as_secs()
    );
    println!(
        "  mcp_request_timeout_secs = {}",
        settings.request_timeout().as_secs()
    );
    println!("  prepare_on_launch        = {}", settings.prepare_on_launch());
}
