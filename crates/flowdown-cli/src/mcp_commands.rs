//! MCP server subcommands.

use clap::Subcommand;

/// Parse a `KEY=VALUE` pair.
fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{s}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{s}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// MCP server management commands.
#[derive(Subcommand)]
pub enum McpCommand {
    /// List configured servers with their connection status
    List,

    /// Create a disabled placeholder server to fill in later
    Create,

    /// Add a server launched as a local process
    AddStdio {
        /// Display name (must be unique)
        name: String,
        /// Executable name or absolute path (e.g. "npx")
        command: String,
        /// Arguments passed to the executable (use `--` before flags)
        #[arg(trailing_var_arg = true)]
        args: Vec<String>,
        /// Environment variable for the process, KEY=VALUE (repeatable)
        #[arg(long = "env", value_parser = parse_key_value)]
        env: Vec<(String, String)>,
        /// Absolute working directory for the process
        #[arg(long)]
        cwd: Option<String>,
        /// Add the server without enabling it
        #[arg(long)]
        disabled: bool,
    },

    /// Add a server reachable over streamable HTTP
    AddHttp {
        /// Display name (must be unique)
        name: String,
        /// Endpoint URL (http or https)
        url: String,
        /// Extra request header, NAME=VALUE (repeatable)
        #[arg(long = "header", value_parser = parse_key_value)]
        headers: Vec<(String, String)>,
        /// Add the server without enabling it
        #[arg(long)]
        disabled: bool,
    },

    /// Remove a server
    Remove {
        /// Server ID
        id: i64,
    },

    /// Enable a server
    Enable {
        /// Server ID
        id: i64,
    },

    /// Disable a server
    Disable {
        /// Server ID
        id: i64,
    },

    /// Connect to a server from scratch and list its tools
    Test {
        /// Server ID
        id: i64,
    },

    /// List tools of one server, or of every enabled server
    Tools {
        /// Server ID (omit for all enabled servers)
        id: Option<i64>,
    },

    /// Call a tool on a server
    Call {
        /// Server ID
        id: i64,
        /// Tool name
        tool: String,
        /// Tool arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },

    /// Connect every enabled server and report the result
    Connect {
        /// Keep connections open until Ctrl+C
        #[arg(long)]
        watch: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_value() {
        assert_eq!(
            parse_key_value("Authorization=Bearer a=b").unwrap(),
            ("Authorization".to_string(), "Bearer a=b".to_string())
        );
        assert_eq!(
            parse_key_value("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_key_value("novalue").is_err());
        assert!(parse_key_value("=x").is_err());
    }
}
