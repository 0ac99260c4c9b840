//! The MCP connection service.
//!
//! [`McpService`] owns the cached server snapshot and the table of live
//! connections. Configuration changes go through the repository, the
//! snapshot is refreshed, and a background loop reconciles live connections
//! against the enabled servers. Every touch of the connection table happens
//! inside the [`SerialExecutor`].

mod connect;
mod lifecycle;

#[cfg(test)]
mod test_support;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use flowdown_core::{
    ConnectionStatus, DEFAULT_CONNECT_TIMEOUT_SECS, McpClientFactory, McpRepositoryError,
    McpServer, McpServerRepository, McpServiceError, McpTool, McpToolResult, NewMcpServer,
    Settings,
};

use crate::connection::McpConnection;
use crate::executor::SerialExecutor;
use crate::observable::Observable;

/// Live connections keyed by server id.
pub type ConnectionTable = HashMap<i64, McpConnection>;

/// Name given to servers created with [`McpService::create`].
const PLACEHOLDER_NAME: &str = "MCP Server";

/// Tunables for [`McpService`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct McpServiceOptions {
    /// Upper bound on a single connect attempt, handshake included.
    pub connect_timeout: Duration,
}

impl Default for McpServiceOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl McpServiceOptions {
    pub const fn from_settings(settings: &Settings) -> Self {
        Self {
            connect_timeout: settings.connect_timeout(),
        }
    }
}

/// Service keeping MCP connections in step with the configured servers.
///
/// Cheap to clone; all clones share the same state. Call [`start`] once to
/// begin reconciling and [`shutdown`] to disconnect everything.
///
/// [`start`]: McpService::start
/// [`shutdown`]: McpService::shutdown
#[derive(Clone)]
pub struct McpService {
    inner: Arc<Inner>,
}

struct Inner {
    repository: Arc<dyn McpServerRepository>,
    factory: Arc<dyn McpClientFactory>,
    options: McpServiceOptions,
    servers: Observable<Vec<McpServer>>,
    executor: SerialExecutor<ConnectionTable>,
    cancel: CancellationToken,
    reconciler: Mutex<Option<JoinHandle<()>>>,
}

impl McpService {
    /// Create a service. Nothing is read or connected until [`McpService::start`].
    pub fn new(
        repository: Arc<dyn McpServerRepository>,
        factory: Arc<dyn McpClientFactory>,
        options: McpServiceOptions,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                repository,
                factory,
                options,
                servers: Observable::default(),
                executor: SerialExecutor::new(ConnectionTable::new()),
                cancel: CancellationToken::new(),
                reconciler: Mutex::new(None),
            }),
        }
    }

    pub fn options(&self) -> McpServiceOptions {
        self.inner.options
    }

    // =========================================================================
    // Server snapshot
    // =========================================================================

    /// Current cached server list, ordered by name.
    pub fn servers(&self) -> Vec<McpServer> {
        self.inner.servers.get()
    }

    /// Receiver woken whenever the server list changes by value.
    pub fn subscribe(&self) -> watch::Receiver<Vec<McpServer>> {
        self.inner.servers.subscribe()
    }

    /// Re-read all servers from the repository and publish them.
    pub async fn refresh(&self) -> Result<(), McpServiceError> {
        let servers = self.inner.repository.list().await?;
        self.inner.servers.publish(servers);
        Ok(())
    }

    /// Read one server straight from the repository.
    pub async fn server(&self, id: i64) -> Result<McpServer, McpServiceError> {
        Ok(self.inner.repository.get(id).await?)
    }

    /// Create a disabled placeholder server with a unique default name.
    pub async fn create(&self) -> Result<McpServer, McpServiceError> {
        let existing = self.inner.repository.list().await?;
        let name = unique_name(&existing);
        let server = self
            .inner
            .repository
            .insert(NewMcpServer::placeholder(name))
            .await?;

        tracing::info!(server_id = server.id, server_name = %server.name, "Created MCP server");
        self.refresh().await?;
        Ok(server)
    }

    /// Validate and persist a new server.
    pub async fn insert(&self, server: NewMcpServer) -> Result<McpServer, McpServiceError> {
        server
            .config
            .validate(server.server_type)
            .map_err(McpServiceError::InvalidConfig)?;

        let server = self.inner.repository.insert(server).await?;
        tracing::info!(
            server_id = server.id,
            server_name = %server.name,
            server_type = server.server_type.as_str(),
            enabled = server.enabled,
            "Added MCP server"
        );
        self.refresh().await?;
        Ok(server)
    }

    /// Delete a server. Its connection, if any, is dropped by reconciliation.
    pub async fn remove(&self, id: i64) -> Result<(), McpServiceError> {
        self.inner.repository.remove(id).await?;
        tracing::info!(server_id = id, "Removed MCP server");
        self.refresh().await
    }

    /// Apply `edit` to the stored server and refresh the snapshot.
    pub async fn edit<F>(&self, id: i64, edit: F) -> Result<McpServer, McpServiceError>
    where
        F: FnOnce(&mut McpServer) + Send + 'static,
    {
        let server = self.inner.repository.edit(id, Box::new(edit)).await?;
        self.refresh().await?;
        Ok(server)
    }

    /// Status as recorded in the snapshot; unknown servers read as disconnected.
    pub fn status(&self, id: i64) -> ConnectionStatus {
        self.inner
            .servers
            .get()
            .iter()
            .find(|s| s.id == id)
            .map_or(ConnectionStatus::Disconnected, |s| s.connection_status)
    }

    // =========================================================================
    // Live connections
    // =========================================================================

    /// Whether a connected client exists for `id`.
    ///
    /// Waits for any running lifecycle operation to finish first.
    pub async fn is_live(&self, id: i64) -> bool {
        let table = self.inner.executor.acquire().await;
        table.get(&id).is_some_and(McpConnection::is_connected)
    }

    /// Ids with a connected client, ascending.
    pub async fn live_server_ids(&self) -> Vec<i64> {
        let table = self.inner.executor.acquire().await;
        let mut ids: Vec<i64> = table
            .iter()
            .filter(|(_, c)| c.is_connected())
            .map(|(id, _)| *id)
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Tools of every live connection, by server id ascending.
    pub async fn list_all_tools(&self) -> Vec<(i64, Vec<McpTool>)> {
        let table = self.inner.executor.acquire().await;
        let mut tools: Vec<(i64, Vec<McpTool>)> = table
            .iter()
            .filter(|(_, c)| c.is_connected())
            .map(|(id, c)| (*id, c.tools().to_vec()))
            .collect();
        tools.sort_unstable_by_key(|(id, _)| *id);
        tools
    }

    /// Tools cached for one live server.
    pub async fn list_server_tools(&self, id: i64) -> Result<Vec<McpTool>, McpServiceError> {
        let table = self.inner.executor.acquire().await;
        table
            .get(&id)
            .filter(|c| c.is_connected())
            .map(|c| c.tools().to_vec())
            .ok_or(McpServiceError::NotConnected(id))
    }

    /// Invoke a tool on a live server.
    ///
    /// The executor slot is held for the duration of the call.
    pub async fn call_tool(
        &self,
        id: i64,
        name: &str,
        arguments: HashMap<String, Value>,
    ) -> Result<McpToolResult, McpServiceError> {
        let table = self.inner.executor.acquire().await;
        let client = table
            .get(&id)
            .filter(|c| c.is_connected())
            .and_then(McpConnection::client)
            .ok_or(McpServiceError::NotConnected(id))?;

        tracing::debug!(server_id = id, tool = name, "Calling MCP tool");
        Ok(client.call_tool(name, arguments).await?)
    }

    // =========================================================================
    // Status bookkeeping
    // =========================================================================

    /// Error out once [`McpService::shutdown`] has run.
    fn ensure_running(&self) -> Result<(), McpServiceError> {
        if self.inner.cancel.is_cancelled() {
            return Err(McpServiceError::Internal(
                "MCP service has been shut down".to_string(),
            ));
        }
        Ok(())
    }

    /// Persist a status change and republish. Failures are logged only.
    async fn mark(&self, id: i64, status: ConnectionStatus) {
        let result = self
            .inner
            .repository
            .edit(id, Box::new(move |s| s.connection_status = status))
            .await;
        self.after_bookkeeping(id, result.map(drop)).await;
    }

    /// Record a successful connect with the negotiated capabilities.
    async fn mark_connected(&self, id: i64, capabilities: Vec<String>) {
        let result = self
            .inner
            .repository
            .edit(
                id,
                Box::new(move |s| {
                    s.connection_status = ConnectionStatus::Connected;
                    s.last_connected_at = Some(chrono::Utc::now());
                    s.capabilities = capabilities;
                }),
            )
            .await;
        self.after_bookkeeping(id, result.map(drop)).await;
    }

    async fn after_bookkeeping(&self, id: i64, result: Result<(), McpRepositoryError>) {
        match result {
            Ok(()) => {
                if let Err(e) = self.refresh().await {
                    tracing::warn!(server_id = id, error = %e, "Failed to refresh MCP servers");
                }
            }
            // Removed while we were working on it
            Err(McpRepositoryError::NotFound(_)) => {
                tracing::debug!(server_id = id, "Skipping status update for removed MCP server");
            }
            Err(e) => {
                tracing::warn!(server_id = id, error = %e, "Failed to record MCP connection status");
            }
        }
    }
}

/// `"MCP Server"`, then `"MCP Server 2"`, `"MCP Server 3"`, ... until unused.
fn unique_name(existing: &[McpServer]) -> String {
    let taken = |name: &str| existing.iter().any(|s| s.name == name);
    if !taken(PLACEHOLDER_NAME) {
        return PLACEHOLDER_NAME.to_string();
    }
    (2..)
        .map(|n| format!("{PLACEHOLDER_NAME} {n}"))
        .find(|name| !taken(name))
        .unwrap_or_else(|| PLACEHOLDER_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use flowdown_core::{McpServerType, TOOLS_CAPABILITY};
    use serde_json::json;

    #[tokio::test]
    async fn test_create_generates_unique_names() {
        let (service, _repo, _factory) = harness();

        let first = service.create().await.unwrap();
        let second = service.create().await.unwrap();
        let third = service.create().await.unwrap();

        assert_eq!(first.name, "MCP Server");
        assert_eq!(second.name, "MCP Server 2");
        assert_eq!(third.name, "MCP Server 3");
        assert!(!first.enabled);
        assert_eq!(first.server_type, McpServerType::Http);
        assert_eq!(service.servers().len(), 3);
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_config() {
        let (service, repo, _factory) = harness();

        let result = service
            .insert(NewMcpServer::new_http("bad", "ftp://example.com"))
            .await;
        assert!(matches!(result, Err(McpServiceError::InvalidConfig(_))));
        assert!(repo.is_empty());
    }

    #[tokio::test]
    async fn test_mutations_refresh_snapshot() {
        let (service, _repo, _factory) = harness();
        let mut rx = service.subscribe();

        let server = service
            .insert(NewMcpServer::new_http("remote", "https://example.com/mcp"))
            .await
            .unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().len(), 1);

        let edited = service
            .edit(server.id, |s| s.name = "renamed".to_string())
            .await
            .unwrap();
        assert_eq!(edited.name, "renamed");
        assert_eq!(service.servers()[0].name, "renamed");

        service.remove(server.id).await.unwrap();
        assert!(service.servers().is_empty());
        assert!(matches!(
            service.server(server.id).await,
            Err(McpServiceError::Repository(McpRepositoryError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_status_defaults_to_disconnected() {
        let (service, _repo, _factory) = harness();
        assert_eq!(service.status(42), ConnectionStatus::Disconnected);
    }

    #[tokio::test]
    async fn test_tool_queries_require_live_connection() {
        let (service, _repo, _factory) = harness();
        assert!(service.list_all_tools().await.is_empty());
        assert!(matches!(
            service.list_server_tools(5).await,
            Err(McpServiceError::NotConnected(5))
        ));
        assert!(matches!(
            service.call_tool(5, "echo", HashMap::new()).await,
            Err(McpServiceError::NotConnected(5))
        ));
    }

    #[tokio::test]
    async fn test_call_tool_on_live_server() {
        let (service, _repo, factory) = harness();
        let server = service
            .insert(NewMcpServer::new_http("remote", "https://example.com/mcp").with_enabled(false))
            .await
            .unwrap();
        factory.script(server.id, Script::with_tools(&["echo"]));

        service.test_connection(server.id).await.unwrap();
        // Disabled servers do not keep the test connection
        assert!(!service.is_live(server.id).await);

        service.edit(server.id, |s| s.enabled = true).await.unwrap();
        service.ensure_or_reconnect(server.id).await.unwrap();
        assert_eq!(service.status(server.id), ConnectionStatus::Connected);
        assert!(service.servers()[0].has_capability(TOOLS_CAPABILITY));

        let result = service
            .call_tool(server.id, "echo", HashMap::from([("x".to_string(), json!(1))]))
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.data, Some(json!({"tool": "echo", "args": {"x": 1}})));
    }

    #[test]
    fn test_unique_name_fills_gaps() {
        let servers = vec![
            server_record(1, NewMcpServer::placeholder("MCP Server")),
            server_record(2, NewMcpServer::placeholder("MCP Server 3")),
        ];
        assert_eq!(unique_name(&servers), "MCP Server 2");
        assert_eq!(unique_name(&[]), "MCP Server");
    }

    #[test]
    fn test_options_from_settings() {
        let settings = Settings {
            mcp_connect_timeout_secs: Some(4),
            ..Settings::with_defaults()
        };
        assert_eq!(
            McpServiceOptions::from_settings(&settings).connect_timeout,
            Duration::from_secs(4)
        );
        assert_eq!(
            McpServiceOptions::default().connect_timeout,
            Duration::from_secs(30)
        );
    }
}
