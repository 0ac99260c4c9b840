//! Shared fixtures for flowdown-mcp integration tests.
//!
//! Servers live in an in-memory SQLite database; clients are scripted fakes
//! that count connects and disconnects.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use flowdown_core::{
    ConnectionStatus, McpClientError, McpClientFactory, McpClientPort, McpRepositoryError,
    McpServer, McpServerEdit, McpServerRepository, McpTool, McpToolResult, NewMcpServer,
};
use flowdown_db::{CoreFactory, setup_test_database};
use flowdown_mcp::{McpService, McpServiceOptions};

/// Delegates to SQLite and records every status written through `edit`.
pub struct RecordingRepository {
    inner: Arc<dyn McpServerRepository>,
    history: Mutex<Vec<(i64, ConnectionStatus)>>,
}

impl RecordingRepository {
    /// Statuses written for `id`, consecutive repeats collapsed.
    pub fn status_history(&self, id: i64) -> Vec<ConnectionStatus> {
        let mut statuses: Vec<_> = self
            .history
            .lock()
            .unwrap()
            .iter()
            .filter(|(sid, _)| *sid == id)
            .map(|(_, s)| *s)
            .collect();
        statuses.dedup();
        statuses
    }

    pub fn clear_history(&self) {
        self.history.lock().unwrap().clear();
    }
}

#[async_trait]
impl McpServerRepository for RecordingRepository {
    async fn insert(&self, server: NewMcpServer) -> Result<McpServer, McpRepositoryError> {
        self.inner.insert(server).await
    }

    async fn get(&self, id: i64) -> Result<McpServer, McpRepositoryError> {
        self.inner.get(id).await
    }

    async fn list(&self) -> Result<Vec<McpServer>, McpRepositoryError> {
        self.inner.list().await
    }

    async fn update(&self, server: &McpServer) -> Result<(), McpRepositoryError> {
        self.inner.update(server).await
    }

    async fn remove(&self, id: i64) -> Result<(), McpRepositoryError> {
        self.inner.remove(id).await
    }

    async fn edit(&self, id: i64, edit: McpServerEdit) -> Result<McpServer, McpRepositoryError> {
        let edited = self.inner.edit(id, edit).await?;
        self.history
            .lock()
            .unwrap()
            .push((id, edited.connection_status));
        Ok(edited)
    }
}

#[derive(Default)]
struct Counters {
    connects: HashMap<i64, usize>,
    disconnects: HashMap<i64, usize>,
    live: HashMap<i64, usize>,
    max_concurrent: HashMap<i64, usize>,
    failing: HashSet<i64>,
}

/// Client factory whose clients always have a `lookup` tool unless told to fail.
///
/// Also tracks how many clients per server are connected at once.
#[derive(Default)]
pub struct CountingFactory {
    counters: Arc<Mutex<Counters>>,
}

impl CountingFactory {
    pub fn fail(&self, id: i64) {
        self.counters.lock().unwrap().failing.insert(id);
    }

    pub fn connects(&self, id: i64) -> usize {
        self.counters.lock().unwrap().connects.get(&id).copied().unwrap_or(0)
    }

    pub fn disconnects(&self, id: i64) -> usize {
        self.counters
            .lock()
            .unwrap()
            .disconnects
            .get(&id)
            .copied()
            .unwrap_or(0)
    }

    /// Most clients ever connected at the same time for `id`.
    pub fn max_concurrent(&self, id: i64) -> usize {
        self.counters
            .lock()
            .unwrap()
            .max_concurrent
            .get(&id)
            .copied()
            .unwrap_or(0)
    }
}

impl McpClientFactory for CountingFactory {
    fn create(&self, server: &McpServer) -> Result<Box<dyn McpClientPort>, McpClientError> {
        Ok(Box::new(CountingClient {
            server_id: server.id,
            counters: self.counters.clone(),
            connected: false,
        }))
    }
}

struct CountingClient {
    server_id: i64,
    counters: Arc<Mutex<Counters>>,
    connected: bool,
}

#[async_trait]
impl McpClientPort for CountingClient {
    async fn connect(&mut self) -> Result<(), McpClientError> {
        // Yield so concurrent work gets a chance to interleave
        tokio::time::sleep(Duration::from_millis(2)).await;

        let mut counters = self.counters.lock().unwrap();
        *counters.connects.entry(self.server_id).or_default() += 1;
        if counters.failing.contains(&self.server_id) {
            return Err(McpClientError::SpawnFailed("exit status 127".to_string()));
        }

        let live = counters.live.entry(self.server_id).or_default();
        *live += 1;
        let concurrent = *live;
        let max = counters.max_concurrent.entry(self.server_id).or_default();
        *max = (*max).max(concurrent);
        drop(counters);

        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        if std::mem::take(&mut self.connected) {
            let mut counters = self.counters.lock().unwrap();
            *counters.disconnects.entry(self.server_id).or_default() += 1;
            if let Some(live) = counters.live.get_mut(&self.server_id) {
                *live = live.saturating_sub(1);
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn list_tools(&self) -> Result<Vec<McpTool>, McpClientError> {
        Ok(vec![McpTool::new("lookup").with_description("Look something up")])
    }

    async fn call_tool(
        &self,
        _name: &str,
        _arguments: HashMap<String, Value>,
    ) -> Result<McpToolResult, McpClientError> {
        Ok(McpToolResult::success(Value::Null))
    }
}

pub struct Fixture {
    pub service: McpService,
    pub repo: Arc<RecordingRepository>,
    pub factory: Arc<CountingFactory>,
}

/// Service over a fresh in-memory database. Not started.
pub async fn fixture() -> Fixture {
    let pool = setup_test_database().await.unwrap();
    let repo = Arc::new(RecordingRepository {
        inner: CoreFactory::mcp_repository(pool),
        history: Mutex::new(Vec::new()),
    });
    let factory = Arc::new(CountingFactory::default());
    let service = McpService::new(repo.clone(), factory.clone(), McpServiceOptions::default());
    Fixture {
        service,
        repo,
        factory,
    }
}

/// Poll `check` until it holds, failing after ~3s.
pub async fn eventually(mut check: impl AsyncFnMut() -> bool) {
    for _ in 0..300 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

/// Wait until live connections match the enabled servers exactly.
pub async fn settle(service: &McpService) {
    eventually(async || {
        let mut enabled: Vec<i64> = service
            .servers()
            .iter()
            .filter(|s| s.enabled)
            .map(|s| s.id)
            .collect();
        enabled.sort_unstable();
        service.live_server_ids().await == enabled
    })
    .await;
}

pub fn http(name: &str) -> NewMcpServer {
    NewMcpServer::new_http(name, format!("https://{name}.example.com/mcp"))
}
