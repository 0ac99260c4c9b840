//! Connect paths that run inside the executor slot.

use tokio::task::JoinHandle;

use flowdown_core::{
    ConnectionStatus, McpClientPort, McpErrorInfo, McpRepositoryError, McpServer,
    McpServiceError, McpTool, TOOLS_CAPABILITY,
};

use super::{ConnectionTable, McpService};
use crate::connection::McpConnection;

impl McpService {
    /// Make sure `id` has a live connection, connecting in the background.
    ///
    /// No-op if a connected client already exists. Missing or disabled
    /// servers are skipped. Failures are logged and leave the server
    /// `Disconnected`; they are never returned.
    pub fn ensure_or_reconnect(&self, id: i64) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut table = service.inner.executor.acquire().await;
            if service.inner.cancel.is_cancelled() {
                return;
            }
            if let Err(e) = service.ensure_by_id(&mut table, id).await {
                tracing::warn!(server_id = id, error = %e, "Failed to reconnect MCP server");
            }
        })
    }

    /// Connect every enabled server that is not live yet.
    ///
    /// Best effort: one failure does not stop the others. Returns the failures.
    /// After shutdown nothing is connected and the single failure is the
    /// shutdown error.
    pub async fn prepare_for_conversation(&self) -> Vec<McpServiceError> {
        let mut table = self.inner.executor.acquire().await;
        if let Err(e) = self.ensure_running() {
            return vec![e];
        }

        let servers = match self.inner.repository.list().await {
            Ok(servers) => servers,
            Err(e) => return vec![e.into()],
        };

        let mut failures = Vec::new();
        for server in servers.iter().filter(|s| s.enabled) {
            if table.get(&server.id).is_some_and(McpConnection::is_connected) {
                continue;
            }
            if let Err(e) = self.ensure_locked(&mut table, server).await {
                failures.push(e);
            }
        }

        if !failures.is_empty() {
            tracing::warn!(
                failed = failures.len(),
                "Some MCP servers could not be connected before the conversation"
            );
        }
        failures
    }

    /// Connect a server from scratch and list its tools.
    ///
    /// Any existing connection for `id` is torn down first. Returns the tool
    /// names joined with `", "`. The new connection is kept only if the
    /// server is enabled. Fails without connecting after shutdown.
    pub async fn test_connection(&self, id: i64) -> Result<String, McpServiceError> {
        let mut table = self.inner.executor.acquire().await;
        self.ensure_running()?;

        if let Some(mut existing) = table.remove(&id) {
            tracing::debug!(server_id = id, "Dropping existing connection before test");
            existing.disconnect().await;
        }

        let server = self.inner.repository.get(id).await.map_err(|e| match e {
            McpRepositoryError::NotFound(_) => {
                McpServiceError::InvalidConfig(format!("MCP server {id} no longer exists"))
            }
            other => other.into(),
        })?;

        self.mark(id, ConnectionStatus::Disconnected).await;
        self.connect_locked(&mut table, &server).await?;

        let listed = self.list_and_cache_tools(&mut table, id).await;

        // The server may have been disabled while we were probing
        let still_enabled = self
            .inner
            .repository
            .get(id)
            .await
            .is_ok_and(|s| s.enabled);
        if !still_enabled {
            if let Some(mut connection) = table.remove(&id) {
                connection.disconnect().await;
            }
            self.mark(id, ConnectionStatus::Disconnected).await;
            tracing::warn!(
                server_id = id,
                server_name = %server.name,
                "Closed test connection to a disabled MCP server"
            );
        }

        let tools = listed?;
        tracing::info!(server_id = id, tools = tools.len(), "MCP connection test succeeded");
        Ok(tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", "))
    }

    /// Callback form of [`McpService::test_connection`].
    ///
    /// `completion` runs on the spawned task with a presentable result.
    pub fn test_connection_with<F>(&self, id: i64, completion: F) -> JoinHandle<()>
    where
        F: FnOnce(Result<String, McpErrorInfo>) + Send + 'static,
    {
        let service = self.clone();
        tokio::spawn(async move {
            let result = service
                .test_connection(id)
                .await
                .map_err(|e| McpErrorInfo::from_error(Some(id), &e));
            completion(result);
        })
    }

    /// Look `id` up and ensure it, honouring the enabled flag.
    async fn ensure_by_id(
        &self,
        table: &mut ConnectionTable,
        id: i64,
    ) -> Result<(), McpServiceError> {
        if table.get(&id).is_some_and(McpConnection::is_connected) {
            tracing::debug!(server_id = id, "MCP server already connected");
            return Ok(());
        }

        let server = match self.inner.repository.get(id).await {
            Ok(server) => server,
            Err(McpRepositoryError::NotFound(_)) => {
                drop_connection(table, id).await;
                tracing::debug!(server_id = id, "Skipping reconnect for removed MCP server");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        if !server.enabled {
            drop_connection(table, id).await;
            tracing::debug!(server_id = id, "Skipping reconnect for disabled MCP server");
            return Ok(());
        }

        self.ensure_locked(table, &server).await
    }

    /// Ensure a live connection built from `server`'s current config.
    ///
    /// A live connection made from different params is replaced.
    pub(super) async fn ensure_locked(
        &self,
        table: &mut ConnectionTable,
        server: &McpServer,
    ) -> Result<(), McpServiceError> {
        let params = server.connection_params();
        if table
            .get(&server.id)
            .is_some_and(|c| c.is_connected() && *c.params() == params)
        {
            return Ok(());
        }

        if let Some(mut stale) = table.remove(&server.id) {
            tracing::debug!(server_id = server.id, "Replacing outdated MCP connection");
            stale.disconnect().await;
        }

        self.mark(server.id, ConnectionStatus::Disconnected).await;
        self.connect_locked(table, server).await
    }

    /// Connect `server`, negotiate capabilities, and record the outcome.
    ///
    /// The caller holds the executor slot and has removed any previous entry.
    pub(super) async fn connect_locked(
        &self,
        table: &mut ConnectionTable,
        server: &McpServer,
    ) -> Result<(), McpServiceError> {
        let id = server.id;
        self.mark(id, ConnectionStatus::Connecting).await;
        tracing::debug!(server_id = id, server_name = %server.name, "Connecting to MCP server");

        let timeout = self.inner.options.connect_timeout;
        let mut connection = McpConnection::new(server.connection_params());
        let attempt =
            tokio::time::timeout(timeout, connection.connect(self.inner.factory.as_ref(), server))
                .await;

        let failure = match attempt {
            Ok(Ok(())) if connection.is_connected() => None,
            Ok(Ok(())) => Some(McpServiceError::ConnectionFailed(format!(
                "client for {} did not report a live session",
                server.name
            ))),
            Ok(Err(e)) => Some(McpServiceError::Client(e)),
            Err(_) => Some(McpServiceError::Timeout {
                server_id: id,
                secs: timeout.as_secs(),
            }),
        };

        if let Some(error) = failure {
            connection.disconnect().await;
            self.mark(id, ConnectionStatus::Disconnected).await;
            tracing::warn!(
                server_id = id,
                server_name = %server.name,
                error = %error,
                "Failed to connect to MCP server"
            );
            return Err(error);
        }

        let tools = match connection.client() {
            Some(client) => negotiate_tools(client, id).await,
            None => Vec::new(),
        };
        let capabilities = if tools.is_empty() {
            Vec::new()
        } else {
            vec![TOOLS_CAPABILITY.to_string()]
        };
        let tool_count = tools.len();
        connection.set_tools(tools);

        if let Some(mut replaced) = table.insert(id, connection) {
            replaced.disconnect().await;
        }
        self.mark_connected(id, capabilities).await;

        tracing::info!(
            server_id = id,
            server_name = %server.name,
            tools = tool_count,
            "Connected to MCP server"
        );
        Ok(())
    }

    /// List tools on the live connection for `id`, refreshing its cache.
    async fn list_and_cache_tools(
        &self,
        table: &mut ConnectionTable,
        id: i64,
    ) -> Result<Vec<McpTool>, McpServiceError> {
        let connection = table
            .get_mut(&id)
            .filter(|c| c.is_connected())
            .ok_or_else(|| {
                McpServiceError::ConnectionFailed(format!("no live client for MCP server {id}"))
            })?;
        let client = connection
            .client()
            .ok_or(McpServiceError::NotConnected(id))?;

        let tools = client.list_tools().await?;
        connection.set_tools(tools.clone());
        Ok(tools)
    }
}

/// Tool discovery: a failed listing counts as no tools.
async fn negotiate_tools(client: &dyn McpClientPort, server_id: i64) -> Vec<McpTool> {
    match client.list_tools().await {
        Ok(tools) => tools,
        Err(e) => {
            tracing::warn!(server_id, error = %e, "Failed to list MCP tools");
            Vec::new()
        }
    }
}

async fn drop_connection(table: &mut ConnectionTable, id: i64) {
    if let Some(mut connection) = table.remove(&id) {
        connection.disconnect().await;
    }
}
