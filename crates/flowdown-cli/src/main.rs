//! CLI entry point.
//!
//! Parses arguments, sets up logging, builds the [`CliContext`] through
//! bootstrap and dispatches to handlers.
//!
//! [`CliContext`]: flowdown_cli::CliContext

use std::process::ExitCode;

use clap::{CommandFactory, Parser};
use tracing_subscriber::EnvFilter;

use flowdown_cli::{Cli, CliConfig, CliError, Commands, bootstrap, handlers};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

/// `RUST_LOG` wins; otherwise `info`, or `debug` with `--verbose`.
fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        // No command provided - show help
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        // Paths needs no database
        Commands::Paths => handlers::paths::execute(cli.database.as_deref()),
        Commands::Mcp { command } => {
            let ctx = bootstrap(CliConfig::with_database(cli.database)?).await?;
            handlers::mcp::execute(&ctx, command).await
        }
        Commands::Config { command } => {
            let ctx = bootstrap(CliConfig::with_database(cli.database)?).await?;
            handlers::config::execute(&ctx, command).await
        }
    }
}
