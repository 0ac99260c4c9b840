//! MCP server domain types.
//!
//! These types are shared between the service, the persistence gateway and
//! any UI consumer observing the server list.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Capability tag recorded when a server exposes at least one tool.
pub const TOOLS_CAPABILITY: &str = "tools";

/// Transport used to reach an MCP server.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum McpServerType {
    /// Local process spoken to over stdin/stdout
    Stdio,
    /// Remote server reached over streamable HTTP
    #[default]
    Http,
}

impl McpServerType {
    /// Stable lowercase name, used for storage and display.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Stdio => "stdio",
            Self::Http => "http",
        }
    }
}

/// Connection bookkeeping for an MCP server.
///
/// Transitions are `Disconnected -> Connecting -> Connected`, and back to
/// `Disconnected` on failure, disable or removal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// No live connection
    #[default]
    Disconnected,
    /// A connect attempt is in flight
    Connecting,
    /// A live client handle exists
    Connected,
}

impl ConnectionStatus {
    /// Stable lowercase name, used for storage and display.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }

    /// Parse the stored representation; unknown values read as disconnected.
    pub fn from_stored(value: &str) -> Self {
        match value {
            "connecting" => Self::Connecting,
            "connected" => Self::Connected,
            _ => Self::Disconnected,
        }
    }
}

impl std::fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Environment variable entry for stdio servers.
///
/// Note: values are stored base64-encoded in the database. This is encoding,
/// not encryption.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct McpEnvEntry {
    /// Environment variable key
    pub key: String,
    /// Environment variable value
    pub value: String,
}

impl McpEnvEntry {
    /// Create a new environment variable entry.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Transport parameters for an MCP server.
///
/// For stdio servers, `command` is required. For HTTP servers, `url` is required.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct McpServerConfig {
    // --- Stdio server fields ---
    /// Command to execute (e.g., "npx" or "/opt/homebrew/bin/npx").
    /// Bare names are resolved against PATH at connect time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Arguments to pass to the executable
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Working directory for the process (must exist if specified)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    // --- HTTP server fields ---
    /// Endpoint of a streamable HTTP server (e.g., `https://example.com/mcp`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Extra headers sent with every HTTP request (e.g., `Authorization`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub headers: BTreeMap<String, String>,
}

impl McpServerConfig {
    /// Create a stdio server configuration.
    #[must_use]
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: Some(command.into()),
            args,
            ..Self::default()
        }
    }

    /// Create an HTTP server configuration.
    #[must_use]
    pub fn http(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Validate configuration based on server type.
    ///
    /// Returns an error if required fields are missing or invalid for the server type.
    pub fn validate(&self, server_type: McpServerType) -> Result<(), String> {
        match server_type {
            McpServerType::Stdio => {
                let command = self
                    .command
                    .as_ref()
                    .ok_or_else(|| "Stdio server requires command".to_string())?;

                if command.is_empty() {
                    return Err("Stdio server command cannot be empty".to_string());
                }

                // Flags belong in args, not in the command itself
                if command.contains(char::is_whitespace) {
                    return Err(
                        "Command must be an executable name/path only (e.g., 'npx'). \
                         Put flags and arguments in the 'args' field."
                            .to_string(),
                    );
                }

                if let Some(ref cwd) = self.working_dir {
                    if !cwd.is_empty() && !std::path::Path::new(cwd).is_absolute() {
                        return Err(format!("Stdio server working_dir must be absolute: {cwd}"));
                    }
                }

                Ok(())
            }
            McpServerType::Http => {
                let url = self
                    .url
                    .as_ref()
                    .ok_or_else(|| "HTTP server requires url".to_string())?;

                if url.is_empty() {
                    return Err("HTTP server url cannot be empty".to_string());
                }

                if !(url.starts_with("http://") || url.starts_with("https://")) {
                    return Err(format!("HTTP server url must use http or https: {url}"));
                }

                Ok(())
            }
        }
    }
}

/// The fields of an [`McpServer`] that decide how a connection is made.
///
/// Two servers with equal params need no reconnect; status bookkeeping is
/// deliberately absent so that writing it back does not look like a change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionParams {
    /// Server ID
    pub id: i64,
    /// Transport
    pub server_type: McpServerType,
    /// Transport parameters
    pub config: McpServerConfig,
    /// Process environment
    pub env: Vec<McpEnvEntry>,
}

/// An MCP server persisted by the gateway.
///
/// Use `NewMcpServer` for servers that haven't been persisted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    /// Database ID of the server.
    pub id: i64,

    /// User-friendly name for the server.
    pub name: String,

    /// Transport (stdio or HTTP).
    pub server_type: McpServerType,

    /// Transport parameters.
    pub config: McpServerConfig,

    /// Environment variables for stdio server processes.
    pub env: Vec<McpEnvEntry>,

    /// Whether the server should be connected and its tools offered in chat.
    pub enabled: bool,

    /// When the server was added.
    pub created_at: DateTime<Utc>,

    /// Current connection bookkeeping.
    pub connection_status: ConnectionStatus,

    /// Last time the server reached `Connected`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_connected_at: Option<DateTime<Utc>>,

    /// Capability tags discovered on the last successful connect (e.g. `"tools"`).
    #[serde(default)]
    pub capabilities: Vec<String>,
}

impl McpServer {
    /// Project the fields that determine how to connect.
    pub fn connection_params(&self) -> ConnectionParams {
        ConnectionParams {
            id: self.id,
            server_type: self.server_type,
            config: self.config.clone(),
            env: self.env.clone(),
        }
    }

    /// Whether the last negotiation found the given capability.
    pub fn has_capability(&self, tag: &str) -> bool {
        self.capabilities.iter().any(|c| c == tag)
    }

    /// Short description of where the server lives, for listings.
    pub fn endpoint(&self) -> String {
        match self.server_type {
            McpServerType::Stdio => {
                let command = self.config.command.as_deref().unwrap_or("");
                if self.config.args.is_empty() {
                    command.to_string()
                } else {
                    format!("{command} {}", self.config.args.join(" "))
                }
            }
            McpServerType::Http => self.config.url.clone().unwrap_or_default(),
        }
    }
}

/// An MCP server to be inserted (no ID yet).
///
/// After insertion, the repository returns an `McpServer` with the assigned ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMcpServer {
    /// User-friendly name for the server.
    pub name: String,

    /// Transport (stdio or HTTP).
    pub server_type: McpServerType,

    /// Transport parameters.
    pub config: McpServerConfig,

    /// Environment variables for stdio server processes.
    pub env: Vec<McpEnvEntry>,

    /// Whether the server should be connected.
    pub enabled: bool,
}

impl NewMcpServer {
    /// Create a new stdio-based MCP server.
    #[must_use]
    pub fn new_stdio(
        name: impl Into<String>,
        command: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            server_type: McpServerType::Stdio,
            config: McpServerConfig::stdio(command, args),
            env: Vec::new(),
            enabled: true,
        }
    }

    /// Create a new HTTP-based MCP server.
    #[must_use]
    pub fn new_http(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_type: McpServerType::Http,
            config: McpServerConfig::http(url),
            env: Vec::new(),
            enabled: true,
        }
    }

    /// Blank, disabled record for the "create" flow.
    ///
    /// The user fills the endpoint in afterwards through an edit, so this
    /// skips config validation on insert.
    #[must_use]
    pub fn placeholder(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            server_type: McpServerType::Http,
            config: McpServerConfig::default(),
            env: Vec::new(),
            enabled: false,
        }
    }

    /// Add an environment variable.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push(McpEnvEntry::new(key, value));
        self
    }

    /// Add an HTTP header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.headers.insert(name.into(), value.into());
        self
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.config.working_dir = Some(dir.into());
        self
    }

    /// Set enabled status.
    #[must_use]
    pub const fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Tool definition advertised by an MCP server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpTool {
    /// Tool name (function name).
    pub name: String,

    /// Human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for input parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<serde_json::Value>,
}

impl McpTool {
    /// Create a new tool definition.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            input_schema: None,
        }
    }

    /// Set the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    /// Set the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: serde_json::Value) -> Self {
        self.input_schema = Some(schema);
        self
    }
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolResult {
    /// Whether the call succeeded.
    pub success: bool,

    /// Result content (if success).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Error message (if failed).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl McpToolResult {
    /// Create a success result.
    #[must_use]
    pub const fn success(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create an error result.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: i64) -> McpServer {
        McpServer {
            id,
            name: format!("server-{id}"),
            server_type: McpServerType::Stdio,
            config: McpServerConfig::stdio("npx", vec!["-y".into(), "@mcp/fetch".into()]),
            env: vec![McpEnvEntry::new("TOKEN", "abc")],
            enabled: true,
            created_at: Utc::now(),
            connection_status: ConnectionStatus::Disconnected,
            last_connected_at: None,
            capabilities: Vec::new(),
        }
    }

    #[test]
    fn test_new_stdio_server() {
        let server = NewMcpServer::new_stdio(
            "Test Server",
            "npx",
            vec!["-y".to_string(), "@test/mcp-server".to_string()],
        )
        .with_env("API_KEY", "secret123");

        assert_eq!(server.name, "Test Server");
        assert_eq!(server.server_type, McpServerType::Stdio);
        assert_eq!(server.config.command, Some("npx".to_string()));
        assert_eq!(server.env, vec![McpEnvEntry::new("API_KEY", "secret123")]);
        assert!(server.enabled);
    }

    #[test]
    fn test_new_http_server_with_header() {
        let server = NewMcpServer::new_http("Remote", "https://example.com/mcp")
            .with_header("Authorization", "Bearer x");

        assert_eq!(server.server_type, McpServerType::Http);
        assert_eq!(server.config.url.as_deref(), Some("https://example.com/mcp"));
        assert_eq!(
            server.config.headers.get("Authorization").map(String::as_str),
            Some("Bearer x")
        );
        assert!(server.config.command.is_none());
    }

    #[test]
    fn test_placeholder_is_disabled() {
        let server = NewMcpServer::placeholder("Untitled");
        assert!(!server.enabled);
        assert!(server.config.url.is_none());
    }

    #[test]
    fn test_validate_stdio_rejects_flags_in_command() {
        let config = McpServerConfig::stdio("npx -y", vec![]);
        assert!(config.validate(McpServerType::Stdio).is_err());
    }

    #[test]
    fn test_validate_stdio_relative_working_dir() {
        let mut config = McpServerConfig::stdio("node", vec![]);
        config.working_dir = Some("relative/dir".to_string());
        let err = config.validate(McpServerType::Stdio).unwrap_err();
        assert!(err.contains("absolute"));
    }

    #[test]
    fn test_validate_http_scheme() {
        assert!(
            McpServerConfig::http("https://example.com/mcp")
                .validate(McpServerType::Http)
                .is_ok()
        );
        assert!(
            McpServerConfig::http("ftp://example.com")
                .validate(McpServerType::Http)
                .is_err()
        );
        assert!(
            McpServerConfig::default()
                .validate(McpServerType::Http)
                .is_err()
        );
    }

    #[test]
    fn test_connection_params_ignore_bookkeeping() {
        let a = sample(1);
        let mut b = a.clone();
        b.connection_status = ConnectionStatus::Connected;
        b.last_connected_at = Some(Utc::now());
        b.capabilities = vec![TOOLS_CAPABILITY.to_string()];

        assert_ne!(a, b);
        assert_eq!(a.connection_params(), b.connection_params());

        b.config.args.push("--verbose".to_string());
        assert_ne!(a.connection_params(), b.connection_params());
    }

    #[test]
    fn test_status_storage_round_trip() {
        for status in [
            ConnectionStatus::Disconnected,
            ConnectionStatus::Connecting,
            ConnectionStatus::Connected,
        ] {
            assert_eq!(ConnectionStatus::from_stored(status.as_str()), status);
        }
        assert_eq!(
            ConnectionStatus::from_stored("garbage"),
            ConnectionStatus::Disconnected
        );
    }

    #[test]
    fn test_serialization() {
        let server = NewMcpServer::new_stdio("Test", "node", vec!["server.js".to_string()]);
        let json = serde_json::to_string(&server).unwrap();
        assert!(json.contains("\"server_type\":\"stdio\""));
        assert!(json.contains("\"name\":\"Test\""));
    }

    #[test]
    fn test_endpoint_and_capability() {
        let mut server = sample(3);
        assert_eq!(server.endpoint(), "npx -y @mcp/fetch");
        assert!(!server.has_capability(TOOLS_CAPABILITY));
        server.capabilities.push(TOOLS_CAPABILITY.to_string());
        assert!(server.has_capability(TOOLS_CAPABILITY));
    }

    #[test]
    fn test_tool_result() {
        let success = McpToolResult::success(serde_json::json!({"temp": 72}));
        assert!(success.success);
        assert!(success.data.is_some());

        let error = McpToolResult::error("Connection failed");
        assert!(!error.success);
        assert_eq!(error.error, Some("Connection failed".to_string()));
    }
}
