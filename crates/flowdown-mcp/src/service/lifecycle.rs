//! Startup, shutdown, and the reconciliation loop.

use std::collections::HashSet;
use std::sync::{Arc, Weak};

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use flowdown_core::{ConnectionParams, ConnectionStatus, McpServer, McpServiceError};

use super::{Inner, McpService};

impl McpService {
    /// Reset every server to `Disconnected`, load the snapshot, and start
    /// reconciling.
    ///
    /// Connections are not restored here; the first reconciliation pass
    /// connects whatever is enabled. Calling `start` twice is a no-op.
    pub async fn start(&self) -> Result<(), McpServiceError> {
        self.ensure_running()?;

        let mut reconciler = self.inner.reconciler.lock().await;
        if reconciler.is_some() {
            tracing::debug!("MCP service already started");
            return Ok(());
        }

        for server in self.inner.repository.list().await? {
            if server.connection_status != ConnectionStatus::Disconnected {
                self.inner
                    .repository
                    .edit(
                        server.id,
                        Box::new(|s| s.connection_status = ConnectionStatus::Disconnected),
                    )
                    .await?;
            }
        }
        self.refresh().await?;

        let servers = self.inner.servers.subscribe();
        *reconciler = Some(tokio::spawn(reconcile_loop(
            Arc::downgrade(&self.inner),
            servers,
            self.inner.cancel.clone(),
        )));

        tracing::info!(servers = self.servers().len(), "MCP service started");
        Ok(())
    }

    /// Stop reconciling and disconnect every live connection.
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let handle = self.inner.reconciler.lock().await.take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "MCP reconciliation loop ended abnormally");
            }
        }

        let mut table = self.inner.executor.acquire().await;
        let connections: Vec<_> = table.drain().collect();
        let count = connections.len();
        for (id, mut connection) in connections {
            connection.disconnect().await;
            self.mark(id, ConnectionStatus::Disconnected).await;
        }

        tracing::info!(disconnected = count, "MCP service stopped");
    }

    /// One reconciliation pass against the current snapshot.
    ///
    /// Enabled servers get a live connection; live connections whose server
    /// is no longer enabled are disconnected, removed and marked.
    pub(super) async fn reconcile(&self) {
        let mut table = self.inner.executor.acquire().await;
        if self.inner.cancel.is_cancelled() {
            return;
        }

        let eligible: Vec<McpServer> = self.servers().into_iter().filter(|s| s.enabled).collect();
        for server in &eligible {
            if let Err(e) = self.ensure_locked(&mut table, server).await {
                tracing::warn!(
                    server_id = server.id,
                    server_name = %server.name,
                    error = %e,
                    "MCP server unavailable after reconciliation"
                );
            }
        }

        let eligible_ids: HashSet<i64> = eligible.iter().map(|s| s.id).collect();
        let stale: Vec<i64> = table
            .keys()
            .filter(|id| !eligible_ids.contains(id))
            .copied()
            .collect();
        for id in stale {
            if let Some(mut connection) = table.remove(&id) {
                connection.disconnect().await;
                self.mark(id, ConnectionStatus::Disconnected).await;
                tracing::info!(server_id = id, "Disconnected MCP server that is no longer enabled");
            }
        }

        tracing::debug!(
            eligible = eligible_ids.len(),
            live = table.len(),
            "MCP reconciliation pass finished"
        );
    }
}

/// What reconciliation reacts to: how each enabled server connects.
fn enabled_params(servers: &[McpServer]) -> Vec<ConnectionParams> {
    servers
        .iter()
        .filter(|s| s.enabled)
        .map(McpServer::connection_params)
        .collect()
}

/// Run a reconciliation pass whenever the enabled servers' connection
/// params change. Status-only updates do not trigger a pass.
///
/// Holds the service weakly so that dropping every handle ends the loop.
async fn reconcile_loop(
    inner: Weak<Inner>,
    mut servers: watch::Receiver<Vec<McpServer>>,
    cancel: CancellationToken,
) {
    let mut last: Option<Vec<ConnectionParams>> = None;

    loop {
        let current = enabled_params(&servers.borrow_and_update());
        if last.as_ref() != Some(&current) {
            let Some(inner) = inner.upgrade() else {
                break;
            };
            McpService { inner }.reconcile().await;
            last = Some(current);
        }

        tokio::select! {
            () = cancel.cancelled() => break,
            changed = servers.changed() => {
                if changed.is_err() {
                    break;
                }
            }
        }
    }

    tracing::debug!("MCP reconciliation loop stopped");
}
