//! In-memory fakes for service tests.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{Value, json};

use flowdown_core::{
    ConnectionStatus, McpClientError, McpClientFactory, McpClientPort, McpRepositoryError,
    McpServer, McpServerEdit, McpServerRepository, McpTool, McpToolResult, NewMcpServer,
};

use super::{McpService, McpServiceOptions};

pub fn harness() -> (McpService, Arc<FakeRepository>, Arc<FakeClientFactory>) {
    let repo = Arc::new(FakeRepository::default());
    let factory = Arc::new(FakeClientFactory::default());
    let service = McpService::new(repo.clone(), factory.clone(), McpServiceOptions::default());
    (service, repo, factory)
}

/// Persisted form of `new` with the given id.
pub fn server_record(id: i64, new: NewMcpServer) -> McpServer {
    McpServer {
        id,
        name: new.name,
        server_type: new.server_type,
        config: new.config,
        env: new.env,
        enabled: new.enabled,
        created_at: Utc::now(),
        connection_status: ConnectionStatus::Disconnected,
        last_connected_at: None,
        capabilities: Vec::new(),
    }
}

/// Poll `check` until it holds, failing the test after ~2s.
pub async fn eventually(mut check: impl AsyncFnMut() -> bool) {
    for _ in 0..200 {
        if check().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[derive(Default)]
struct RepoState {
    servers: BTreeMap<i64, McpServer>,
    next_id: i64,
    history: Vec<(i64, ConnectionStatus)>,
}

/// Repository keeping servers in a map and recording every status written
/// through `edit`.
#[derive(Default)]
pub struct FakeRepository {
    state: Mutex<RepoState>,
}

impl FakeRepository {
    /// Insert without going through the service.
    pub fn seed(&self, new: NewMcpServer) -> i64 {
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let id = state.next_id;
        state.servers.insert(id, server_record(id, new));
        id
    }

    pub fn get_now(&self, id: i64) -> McpServer {
        self.state.lock().unwrap().servers[&id].clone()
    }

    pub fn force_status(&self, id: i64, status: ConnectionStatus) {
        let mut state = self.state.lock().unwrap();
        if let Some(server) = state.servers.get_mut(&id) {
            server.connection_status = status;
        }
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().unwrap().servers.is_empty()
    }

    /// Statuses written for `id`, with consecutive repeats collapsed.
    pub fn status_history(&self, id: i64) -> Vec<ConnectionStatus> {
        let mut statuses: Vec<ConnectionStatus> = self
            .state
            .lock()
            .unwrap()
            .history
            .iter()
            .filter(|(sid, _)| *sid == id)
            .map(|(_, status)| *status)
            .collect();
        statuses.dedup();
        statuses
    }
}

#[async_trait]
impl McpServerRepository for FakeRepository {
    async fn insert(&self, server: NewMcpServer) -> Result<McpServer, McpRepositoryError> {
        let mut state = self.state.lock().unwrap();
        if state.servers.values().any(|s| s.name == server.name) {
            return Err(McpRepositoryError::Conflict(server.name));
        }
        state.next_id += 1;
        let record = server_record(state.next_id, server);
        state.servers.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: i64) -> Result<McpServer, McpRepositoryError> {
        self.state
            .lock()
            .unwrap()
            .servers
            .get(&id)
            .cloned()
            .ok_or_else(|| McpRepositoryError::NotFound(format!("id={id}")))
    }

    async fn list(&self) -> Result<Vec<McpServer>, McpRepositoryError> {
        let mut servers: Vec<McpServer> =
            self.state.lock().unwrap().servers.values().cloned().collect();
        servers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(servers)
    }

    async fn update(&self, server: &McpServer) -> Result<(), McpRepositoryError> {
        let mut state = self.state.lock().unwrap();
        let slot = state
            .servers
            .get_mut(&server.id)
            .ok_or_else(|| McpRepositoryError::NotFound(format!("id={}", server.id)))?;
        *slot = server.clone();
        Ok(())
    }

    async fn remove(&self, id: i64) -> Result<(), McpRepositoryError> {
        self.state
            .lock()
            .unwrap()
            .servers
            .remove(&id)
            .map(drop)
            .ok_or_else(|| McpRepositoryError::NotFound(format!("id={id}")))
    }

    async fn edit(&self, id: i64, edit: McpServerEdit) -> Result<McpServer, McpRepositoryError> {
        let mut state = self.state.lock().unwrap();
        let server = state
            .servers
            .get_mut(&id)
            .ok_or_else(|| McpRepositoryError::NotFound(format!("id={id}")))?;
        edit(server);
        server.id = id;
        let edited = server.clone();
        state.history.push((id, edited.connection_status));
        Ok(edited)
    }
}

/// How fake clients for one server behave.
#[derive(Debug, Clone)]
pub struct Script {
    pub tools: Vec<McpTool>,
    pub fail_connect: bool,
    pub list_fails: bool,
    pub connect_delay: Option<Duration>,
}

impl Script {
    pub fn with_tools(names: &[&str]) -> Self {
        Self {
            tools: names.iter().map(|n| McpTool::new(*n)).collect(),
            fail_connect: false,
            list_fails: false,
            connect_delay: None,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail_connect: true,
            ..Self::with_tools(&[])
        }
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::with_tools(&["echo"])
    }
}

#[derive(Default)]
struct FactoryState {
    scripts: HashMap<i64, Script>,
    connects: HashMap<i64, usize>,
    disconnects: HashMap<i64, usize>,
}

/// Factory producing scripted clients and counting their connects and
/// disconnects per server.
#[derive(Default)]
pub struct FakeClientFactory {
    state: Arc<Mutex<FactoryState>>,
}

impl FakeClientFactory {
    /// Behaviour for clients created from now on.
    pub fn script(&self, id: i64, script: Script) {
        self.state.lock().unwrap().scripts.insert(id, script);
    }

    pub fn connects(&self, id: i64) -> usize {
        self.state.lock().unwrap().connects.get(&id).copied().unwrap_or(0)
    }

    pub fn disconnects(&self, id: i64) -> usize {
        self.state
            .lock()
            .unwrap()
            .disconnects
            .get(&id)
            .copied()
            .unwrap_or(0)
    }
}

impl McpClientFactory for FakeClientFactory {
    fn create(&self, server: &McpServer) -> Result<Box<dyn McpClientPort>, McpClientError> {
        let script = self
            .state
            .lock()
            .unwrap()
            .scripts
            .get(&server.id)
            .cloned()
            .unwrap_or_default();
        Ok(Box::new(FakeClient {
            server_id: server.id,
            script,
            state: self.state.clone(),
            connected: false,
        }))
    }
}

struct FakeClient {
    server_id: i64,
    script: Script,
    state: Arc<Mutex<FactoryState>>,
    connected: bool,
}

#[async_trait]
impl McpClientPort for FakeClient {
    async fn connect(&mut self) -> Result<(), McpClientError> {
        *self
            .state
            .lock()
            .unwrap()
            .connects
            .entry(self.server_id)
            .or_default() += 1;
        if let Some(delay) = self.script.connect_delay {
            tokio::time::sleep(delay).await;
        }
        if self.script.fail_connect {
            return Err(McpClientError::Http("connection refused".to_string()));
        }
        self.connected = true;
        Ok(())
    }

    async fn disconnect(&mut self) {
        if std::mem::take(&mut self.connected) {
            *self
                .state
                .lock()
                .unwrap()
                .disconnects
                .entry(self.server_id)
                .or_default() += 1;
        }
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    async fn list_tools(&self) -> Result<Vec<McpTool>, McpClientError> {
        if self.script.list_fails {
            return Err(McpClientError::Server {
                code: -32601,
                message: "Method not found".to_string(),
            });
        }
        Ok(self.script.tools.clone())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: HashMap<String, Value>,
    ) -> Result<McpToolResult, McpClientError> {
        Ok(McpToolResult::success(json!({ "tool": name, "args": arguments })))
    }
}
