//! MCP over streamable HTTP.
//!
//! Every JSON-RPC message is POSTed to the server URL. The server answers
//! either with a plain JSON body or with a `text/event-stream` body carrying
//! the response as an SSE event. A session id handed out on `initialize` is
//! echoed back in the `Mcp-Session-Id` header.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde_json::Value;

use flowdown_core::{
    McpClientError, McpClientPort, McpServer, McpServerType, McpTool, McpToolResult,
};

use super::protocol::{
    self, InitializeResult, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, RpcChannel,
    ServerCapabilities,
};

const SESSION_HEADER: &str = "mcp-session-id";

/// Client for an MCP server reachable over HTTP.
pub struct HttpClient {
    server_id: i64,
    url: String,
    http: reqwest::Client,
    session: Option<HttpSession>,
}

/// An initialized HTTP session.
struct HttpSession {
    http: reqwest::Client,
    url: String,
    session_id: Option<String>,
    capabilities: ServerCapabilities,
    next_id: AtomicU64,
}

fn map_reqwest_error(e: &reqwest::Error) -> McpClientError {
    if e.is_timeout() {
        McpClientError::Timeout
    } else {
        McpClientError::Http(e.to_string())
    }
}

impl HttpClient {
    /// Build an unconnected client from an HTTP server record.
    ///
    /// Custom headers from the record are sent with every request.
    pub fn new(server: &McpServer, request_timeout: Duration) -> Result<Self, McpClientError> {
        if server.server_type != McpServerType::Http {
            return Err(McpClientError::InvalidConfig(format!(
                "server {} is not an HTTP server",
                server.id
            )));
        }
        let url = server
            .config
            .url
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| McpClientError::InvalidConfig("HTTP server requires url".into()))?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/json, text/event-stream"),
        );
        for (name, value) in &server.config.headers {
            let name = HeaderName::try_from(name.as_str())
                .map_err(|e| McpClientError::InvalidConfig(format!("Invalid header '{name}': {e}")))?;
            let value = HeaderValue::try_from(value.as_str()).map_err(|e| {
                McpClientError::InvalidConfig(format!("Invalid value for header '{name}': {e}"))
            })?;
            headers.insert(name, value);
        }

        let http = reqwest::Client::builder()
            .timeout(request_timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| McpClientError::Http(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            server_id: server.id,
            url,
            http,
            session: None,
        })
    }
}

impl HttpSession {
    async fn post(&self, body: &impl Serialize) -> Result<reqwest::Response, McpClientError> {
        let mut request = self.http.post(&self.url).json(body);
        if let Some(ref session_id) = self.session_id {
            request = request.header(SESSION_HEADER, session_id);
        }

        let response = request.send().await.map_err(|e| map_reqwest_error(&e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(McpClientError::Http(format!("HTTP {status}: {text}")));
        }
        Ok(response)
    }

    async fn notify(&self, method: &str) -> Result<(), McpClientError> {
        self.post(&JsonRpcNotification::new(method)).await?;
        Ok(())
    }

    /// Best-effort session termination.
    async fn terminate(&self) {
        let Some(ref session_id) = self.session_id else {
            return;
        };
        let result = self
            .http
            .delete(&self.url)
            .header(SESSION_HEADER, session_id)
            .send()
            .await;
        if let Err(e) = result {
            tracing::debug!(error = %e, "Failed to terminate MCP HTTP session");
        }
    }
}

/// Pull the response to `id` out of a JSON or SSE body.
async fn read_response(
    response: reqwest::Response,
    id: u64,
) -> Result<JsonRpcMessage, McpClientError> {
    let is_sse = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.starts_with("text/event-stream"));
    let body = response.text().await.map_err(|e| map_reqwest_error(&e))?;

    if is_sse {
        return protocol::parse_sse_messages(&body)
            .into_iter()
            .find(|message| message.answers(id))
            .ok_or_else(|| {
                McpClientError::Protocol(format!("No response to request {id} in event stream"))
            });
    }

    let message: JsonRpcMessage = serde_json::from_str(&body)?;
    if message.answers(id) {
        Ok(message)
    } else {
        Err(McpClientError::Protocol(format!(
            "Response does not match request {id}"
        )))
    }
}

#[async_trait]
impl RpcChannel for HttpSession {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let response = self.post(&JsonRpcRequest::new(id, method, params)).await?;
        read_response(response, id).await?.into_result()
    }

    fn advertises_tools(&self) -> bool {
        self.capabilities.tools.is_some()
    }
}

#[async_trait]
impl McpClientPort for HttpClient {
    async fn connect(&mut self) -> Result<(), McpClientError> {
        if self.session.is_some() {
            return Ok(());
        }

        let mut session = HttpSession {
            http: self.http.clone(),
            url: self.url.clone(),
            session_id: None,
            capabilities: ServerCapabilities::default(),
            next_id: AtomicU64::new(1),
        };

        let id = session.next_id.fetch_add(1, Ordering::SeqCst);
        let response = session
            .post(&JsonRpcRequest::new(
                id,
                "initialize",
                Some(protocol::initialize_params()),
            ))
            .await?;
        session.session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let init: InitializeResult =
            serde_json::from_value(read_response(response, id).await?.into_result()?)?;
        session.capabilities = init.capabilities;

        tracing::debug!(
            server_id = self.server_id,
            url = %self.url,
            protocol_version = %init.protocol_version,
            session = ?session.session_id,
            server_name = ?init.server_info.as_ref().map(|s| &s.name),
            "MCP HTTP session initialized"
        );

        if let Err(e) = session.notify("notifications/initialized").await {
            session.terminate().await;
            return Err(e);
        }

        self.session = Some(session);
        Ok(())
    }

    async fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.terminate().await;
        }
    }

    fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    async fn list_tools(&self) -> Result<Vec<McpTool>, McpClientError> {
        let session = self.session.as_ref().ok_or(McpClientError::NotConnected)?;
        protocol::list_tools(session).await
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: HashMap<String, Value>,
    ) -> Result<McpToolResult, McpClientError> {
        let session = self.session.as_ref().ok_or(McpClientError::NotConnected)?;
        protocol::call_tool(session, name, arguments).await
    }
}
