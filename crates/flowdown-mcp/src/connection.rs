//! One live (or about-to-be-live) link to an MCP server.

use std::fmt;

use flowdown_core::{
    ConnectionParams, McpClientError, McpClientFactory, McpClientPort, McpServer, McpTool,
};

/// A server id, the config it was built from, and the client once connected.
///
/// The client handle only exists while connected; a failed connect leaves
/// the connection empty so nothing half-open is kept around.
pub struct McpConnection {
    params: ConnectionParams,
    client: Option<Box<dyn McpClientPort>>,
    tools: Vec<McpTool>,
}

impl McpConnection {
    pub const fn new(params: ConnectionParams) -> Self {
        Self {
            params,
            client: None,
            tools: Vec::new(),
        }
    }

    pub const fn server_id(&self) -> i64 {
        self.params.id
    }

    /// Config snapshot this connection was created from.
    pub const fn params(&self) -> &ConnectionParams {
        &self.params
    }

    /// Create a client through `factory` and connect it.
    ///
    /// No-op when already connected.
    pub async fn connect(
        &mut self,
        factory: &dyn McpClientFactory,
        server: &McpServer,
    ) -> Result<(), McpClientError> {
        if self.is_connected() {
            return Ok(());
        }

        let mut client = factory.create(server)?;
        client.connect().await?;
        self.client = Some(client);
        Ok(())
    }

    /// Tear down the client, if any. Cached tools are dropped with it.
    pub async fn disconnect(&mut self) {
        if let Some(mut client) = self.client.take() {
            client.disconnect().await;
        }
        self.tools.clear();
    }

    pub fn is_connected(&self) -> bool {
        self.client.as_ref().is_some_and(|c| c.is_connected())
    }

    pub fn client(&self) -> Option<&dyn McpClientPort> {
        self.client.as_deref()
    }

    /// Tools found during capability negotiation.
    pub fn tools(&self) -> &[McpTool] {
        &self.tools
    }

    pub fn set_tools(&mut self, tools: Vec<McpTool>) {
        self.tools = tools;
    }
}

impl fmt::Debug for McpConnection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("McpConnection")
            .field("server_id", &self.params.id)
            .field("connected", &self.is_connected())
            .field("tools", &self.tools.len())
            .finish_non_exhaustive()
    }
}
