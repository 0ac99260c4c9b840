//! MCP command handler.
//!
//! Server management goes straight through [`McpService`]; commands that
//! need live connections (`test`, `tools`, `call`, `connect`) connect on
//! demand and shut the service down before returning.

use std::collections::HashMap;

use anyhow::Result;
use flowdown_core::{McpServer, McpServiceError, McpTool, NewMcpServer};
use flowdown_mcp::McpService;
use serde_json::Value;

use crate::bootstrap::CliContext;
use crate::error::CliError;
use crate::mcp_commands::McpCommand;
use crate::presentation::{print_server_table, status_marker, truncate_string};

/// Execute an MCP subcommand.
pub async fn execute(ctx: &CliContext, command: McpCommand) -> Result<()> {
    let mcp = ctx.mcp();
    mcp.refresh().await.map_err(CliError::from)?;

    match command {
        McpCommand::List => list(mcp),
        McpCommand::Create => {
            let server = mcp.create().await.map_err(CliError::from)?;
            println!("✓ Created '{}' (ID: {}), disabled", server.name, server.id);
            println!("  Configure it, then run 'flowdown mcp enable {}'.", server.id);
            Ok(())
        }
        McpCommand::AddStdio {
            name,
            command,
            args,
            env,
            cwd,
            disabled,
        } => {
            let mut server = NewMcpServer::new_stdio(name, command, args).with_enabled(!disabled);
            for (key, value) in env {
                server = server.with_env(key, value);
            }
            if let Some(dir) = cwd {
                server = server.with_working_dir(dir);
            }
            add(mcp, server).await
        }
        McpCommand::AddHttp {
            name,
            url,
            headers,
            disabled,
        } => {
            let mut server = NewMcpServer::new_http(name, url).with_enabled(!disabled);
            for (key, value) in headers {
                server = server.with_header(key, value);
            }
            add(mcp, server).await
        }
        McpCommand::Remove { id } => {
            let server = mcp.server(id).await.map_err(CliError::from)?;
            mcp.remove(id).await.map_err(CliError::from)?;
            println!("✓ Removed '{}' (ID: {id})", server.name);
            Ok(())
        }
        McpCommand::Enable { id } => set_enabled(mcp, id, true).await,
        McpCommand::Disable { id } => set_enabled(mcp, id, false).await,
        McpCommand::Test { id } => {
            let result = mcp.test_connection(id).await;
            mcp.shutdown().await;
            let tools = result.map_err(CliError::from)?;
            if tools.is_empty() {
                println!("✓ Connected; the server exposes no tools");
            } else {
                println!("✓ Connected; tools: {tools}");
            }
            Ok(())
        }
        McpCommand::Tools { id } => {
            let result = tools(mcp, id).await;
            mcp.shutdown().await;
            result
        }
        McpCommand::Call { id, tool, args } => {
            let arguments: HashMap<String, Value> = serde_json::from_str(&args)
                .map_err(|e| CliError::Arguments(format!("--args must be a JSON object: {e}")))?;
            let result = call(mcp, id, &tool, arguments).await;
            mcp.shutdown().await;
            result
        }
        McpCommand::Connect { watch } => {
            let result = connect(ctx, watch).await;
            mcp.shutdown().await;
            result
        }
    }
}

fn list(mcp: &McpService) -> Result<()> {
    let servers = mcp.servers();
    if servers.is_empty() {
        println!("No MCP servers configured.");
        println!("Use 'flowdown mcp add-stdio' or 'flowdown mcp add-http' to add one.");
        return Ok(());
    }

    println!("Found {} MCP server(s):\n", servers.len());
    print_server_table(&servers);
    Ok(())
}

async fn add(mcp: &McpService, server: NewMcpServer) -> Result<()> {
    let server = mcp.insert(server).await.map_err(CliError::from)?;
    println!(
        "✓ Added '{}' (ID: {}, {}{})",
        server.name,
        server.id,
        server.server_type.as_str(),
        if server.enabled { "" } else { ", disabled" }
    );
    Ok(())
}

async fn set_enabled(mcp: &McpService, id: i64, enabled: bool) -> Result<()> {
    let server = mcp
        .edit(id, move |s| s.enabled = enabled)
        .await
        .map_err(CliError::from)?;
    let verb = if enabled { "Enabled" } else { "Disabled" };
    println!("✓ {verb} '{}' (ID: {id})", server.name);
    Ok(())
}

/// Connect one server (or every enabled server) and print the cached tools.
async fn tools(mcp: &McpService, id: Option<i64>) -> Result<()> {
    match id {
        Some(id) => {
            let server = connect_one(mcp, id).await?;
            let tools = mcp.list_server_tools(id).await.map_err(CliError::from)?;
            print_tools(&server, &tools);
        }
        None => {
            report_failures(&mcp.prepare_for_conversation().await);
            mcp.refresh().await.map_err(CliError::from)?;
            let servers = mcp.servers();
            let all = mcp.list_all_tools().await;
            if all.is_empty() {
                println!("No connected MCP servers.");
            }
            for (id, tools) in all {
                if let Some(server) = servers.iter().find(|s| s.id == id) {
                    print_tools(server, &tools);
                }
            }
        }
    }
    Ok(())
}

async fn call(
    mcp: &McpService,
    id: i64,
    tool: &str,
    arguments: HashMap<String, Value>,
) -> Result<()> {
    connect_one(mcp, id).await?;
    let result = mcp
        .call_tool(id, tool, arguments)
        .await
        .map_err(CliError::from)?;

    if result.success {
        let data = result.data.unwrap_or(Value::Null);
        println!("{}", serde_json::to_string_pretty(&data)?);
        Ok(())
    } else {
        let message = result.error.unwrap_or_else(|| "unknown error".to_string());
        Err(CliError::Core(format!("Tool '{tool}' failed: {message}")).into())
    }
}

async fn connect(ctx: &CliContext, watch: bool) -> Result<()> {
    let mcp = ctx.mcp();
    ctx.start_mcp().await?;
    report_failures(&mcp.prepare_for_conversation().await);
    print_server_table(&mcp.servers());

    if !watch {
        return Ok(());
    }

    println!("\nWatching for changes, press Ctrl+C to stop.");
    let mut updates = mcp.subscribe();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                let servers = updates.borrow_and_update().clone();
                for server in &servers {
                    println!(
                        "{} {:<22} {}",
                        status_marker(server.connection_status),
                        truncate_string(&server.name, 21),
                        server.connection_status
                    );
                }
            }
        }
    }
    Ok(())
}

/// Connect `id` if it is enabled and not already live.
async fn connect_one(mcp: &McpService, id: i64) -> Result<McpServer> {
    let server = mcp.server(id).await.map_err(CliError::from)?;
    if !server.enabled {
        return Err(CliError::Arguments(format!(
            "'{}' is disabled; run 'flowdown mcp enable {id}' first",
            server.name
        ))
        .into());
    }

    mcp.ensure_or_reconnect(id)
        .await
        .map_err(|e| CliError::Core(e.to_string()))?;
    if !mcp.is_live(id).await {
        return Err(CliError::from(McpServiceError::ConnectionFailed(format!(
            "could not connect to '{}', run 'flowdown -v mcp test {id}' for details",
            server.name
        )))
        .into());
    }
    Ok(server)
}

fn report_failures(failures: &[McpServiceError]) {
    for failure in failures {
        eprintln!("✗ {failure}");
    }
}

fn print_tools(server: &McpServer, tools: &[McpTool]) {
    println!("{} (ID: {}): {} tool(s)", server.name, server.id, tools.len());
    for tool in tools {
        match tool.description.as_deref() {
            Some(desc) => println!("  {:<28} {}", tool.name, truncate_string(desc, 70)),
            None => println!("  {}", tool.name),
        }
    }
}
