//! JSON-RPC 2.0 framing and the handful of MCP methods the service uses.
//!
//! Reference: <https://spec.modelcontextprotocol.io/>

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::HashMap;

use flowdown_core::{McpClientError, McpTool, McpToolResult};

/// Protocol revision offered in `initialize`.
pub const PROTOCOL_VERSION: &str = "2025-03-26";

/// Upper bound on `tools/list` pages, in case a server keeps handing out cursors.
const MAX_TOOL_PAGES: usize = 64;

/// JSON-RPC 2.0 request.
#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub jsonrpc: &'static str,
    pub id: u64,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    pub const fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            method,
            params,
        }
    }
}

/// JSON-RPC 2.0 notification (no id, no response).
#[derive(Debug, Serialize)]
pub struct JsonRpcNotification<'a> {
    pub jsonrpc: &'static str,
    pub method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl<'a> JsonRpcNotification<'a> {
    pub const fn new(method: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            method,
            params: None,
        }
    }
}

/// Any inbound JSON-RPC message.
///
/// Server-initiated requests and notifications carry `method`; responses do not.
#[derive(Debug, Deserialize)]
pub struct JsonRpcMessage {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
}

impl JsonRpcMessage {
    /// Whether this is the response to request `id`.
    pub fn answers(&self, id: u64) -> bool {
        self.method.is_none() && self.id.as_ref().and_then(Value::as_u64) == Some(id)
    }

    /// Unwrap the `result`, turning a JSON-RPC error into [`McpClientError::Server`].
    pub fn into_result(self) -> Result<Value, McpClientError> {
        if let Some(err) = self.error {
            return Err(McpClientError::Server {
                code: err.code,
                message: err.message,
            });
        }
        self.result
            .ok_or_else(|| McpClientError::Protocol("Missing result in response".to_string()))
    }
}

/// MCP `initialize` result.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    pub protocol_version: String,
    #[serde(default)]
    pub server_info: Option<ServerInfo>,
    #[serde(default)]
    pub capabilities: ServerCapabilities,
}

/// Server information from initialize.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    #[serde(default)]
    pub version: Option<String>,
}

/// Capabilities advertised by the server. Only `tools` is acted on.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerCapabilities {
    #[serde(default)]
    pub tools: Option<Value>,
}

/// Tool entry from `tools/list`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ToolSchema {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
}

impl From<ToolSchema> for McpTool {
    fn from(schema: ToolSchema) -> Self {
        Self {
            name: schema.name,
            description: schema.description,
            input_schema: schema.input_schema,
        }
    }
}

/// Params for the `initialize` request.
pub fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "clientInfo": {
            "name": "flowdown",
            "version": env!("CARGO_PKG_VERSION")
        },
        "capabilities": {}
    })
}

/// Extract JSON-RPC messages from a `text/event-stream` body.
///
/// Events are separated by blank lines; multi-line `data:` fields are joined
/// with newlines. Events whose data is not JSON are skipped.
pub fn parse_sse_messages(body: &str) -> Vec<JsonRpcMessage> {
    let normalized = body.replace("\r\n", "\n");
    normalized
        .split("\n\n")
        .filter_map(|event| {
            let data: Vec<&str> = event
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(|value| value.strip_prefix(' ').unwrap_or(value))
                .collect();
            if data.is_empty() {
                return None;
            }
            match serde_json::from_str(&data.join("\n")) {
                Ok(message) => Some(message),
                Err(e) => {
                    tracing::debug!(error = %e, "Skipping non-JSON SSE event");
                    None
                }
            }
        })
        .collect()
}

/// A request/response channel to an initialized MCP session.
#[async_trait]
pub trait RpcChannel: Send + Sync {
    /// Send `method` and wait for its result.
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpClientError>;

    /// Whether `initialize` advertised the `tools` capability.
    fn advertises_tools(&self) -> bool;
}

/// `tools/list`, following pagination cursors.
pub async fn list_tools<C: RpcChannel + ?Sized>(channel: &C) -> Result<Vec<McpTool>, McpClientError> {
    if !channel.advertises_tools() {
        return Ok(Vec::new());
    }

    let mut tools = Vec::new();
    let mut cursor: Option<String> = None;

    for _ in 0..MAX_TOOL_PAGES {
        let params = cursor.as_ref().map(|c| json!({ "cursor": c }));
        let result = channel.request("tools/list", params).await?;

        let page: Vec<ToolSchema> =
            serde_json::from_value(result.get("tools").cloned().unwrap_or_else(|| json!([])))?;
        tools.extend(page.into_iter().map(McpTool::from));

        cursor = result
            .get("nextCursor")
            .and_then(Value::as_str)
            .map(str::to_string);
        if cursor.is_none() {
            return Ok(tools);
        }
    }

    tracing::warn!(pages = MAX_TOOL_PAGES, "tools/list pagination did not terminate");
    Ok(tools)
}

/// `tools/call`, mapping `isError` results to [`McpToolResult::error`].
pub async fn call_tool<C: RpcChannel + ?Sized>(
    channel: &C,
    name: &str,
    arguments: HashMap<String, Value>,
) -> Result<McpToolResult, McpClientError> {
    let params = json!({
        "name": name,
        "arguments": arguments
    });

    let result = channel.request("tools/call", Some(params)).await?;
    Ok(tool_result_from_value(&result))
}

fn tool_result_from_value(result: &Value) -> McpToolResult {
    let content = result.get("content").cloned().unwrap_or_else(|| json!([]));
    let is_error = result
        .get("isError")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    if !is_error {
        return McpToolResult::success(content);
    }

    let message = content
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("text").and_then(Value::as_str))
                .collect::<Vec<_>>()
                .join("\n")
        })
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "Unknown error".to_string());

    McpToolResult::error(message)
}
