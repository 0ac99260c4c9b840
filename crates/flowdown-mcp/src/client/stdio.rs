//! MCP over a child process's stdin/stdout.
//!
//! Messages are newline-delimited JSON-RPC 2.0. Non-JSON lines on stdout
//! (package managers like `npx` print banners) are skipped, and stderr is
//! forwarded to `tracing` at debug level.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;

use flowdown_core::{
    McpClientError, McpClientPort, McpEnvEntry, McpServer, McpServerType, McpTool, McpToolResult,
};

use super::protocol::{
    self, InitializeResult, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, RpcChannel,
    ServerCapabilities,
};
use crate::path;

/// Client for an MCP server launched as a local process.
pub struct StdioClient {
    server_id: i64,
    command: String,
    args: Vec<String>,
    working_dir: Option<String>,
    env: Vec<McpEnvEntry>,
    request_timeout: Duration,
    session: Option<StdioSession>,
}

struct StdioPipes {
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// A spawned, initialized server process.
///
/// The child itself is owned by a supervisor task that clears `alive` when
/// the process exits, for whatever reason.
struct StdioSession {
    pipes: Mutex<StdioPipes>,
    next_id: AtomicU64,
    request_timeout: Duration,
    capabilities: ServerCapabilities,
    stderr_task: JoinHandle<()>,
    alive: Arc<AtomicBool>,
    kill: Option<oneshot::Sender<()>>,
    supervisor: JoinHandle<()>,
}

impl StdioClient {
    /// Build an unconnected client from a stdio server record.
    pub fn new(server: &McpServer, request_timeout: Duration) -> Result<Self, McpClientError> {
        if server.server_type != McpServerType::Stdio {
            return Err(McpClientError::InvalidConfig(format!(
                "server {} is not a stdio server",
                server.id
            )));
        }
        let command = server
            .config
            .command
            .clone()
            .filter(|c| !c.is_empty())
            .ok_or_else(|| McpClientError::InvalidConfig("Stdio server requires command".into()))?;

        Ok(Self {
            server_id: server.id,
            command,
            args: server.config.args.clone(),
            working_dir: server.config.working_dir.clone().filter(|d| !d.is_empty()),
            env: server.env.clone(),
            request_timeout,
            session: None,
        })
    }

    fn spawn(&self) -> Result<(Child, StdioPipes, ChildStderr), McpClientError> {
        let exe_path = path::resolve_command(&self.command).map_err(McpClientError::SpawnFailed)?;

        if let Some(ref cwd) = self.working_dir {
            path::validate_working_dir(cwd).map_err(McpClientError::SpawnFailed)?;
        }

        let effective_path = path::build_effective_path(&exe_path);

        let mut command = Command::new(&exe_path);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .env("PATH", &effective_path)
            .kill_on_drop(true);

        if let Some(ref cwd) = self.working_dir {
            command.current_dir(cwd);
        }

        // User-provided variables win over the computed PATH
        for entry in &self.env {
            command.env(&entry.key, &entry.value);
        }

        let mut child = command.spawn().map_err(|e| {
            McpClientError::SpawnFailed(format!(
                "Failed to spawn '{}': {e}\nArgs: {:?}\nCwd: {:?}\nEffective PATH: {}",
                exe_path.display(),
                self.args,
                self.working_dir,
                effective_path.to_string_lossy()
            ))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpClientError::SpawnFailed("Failed to get stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpClientError::SpawnFailed("Failed to get stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| McpClientError::SpawnFailed("Failed to get stderr".to_string()))?;

        tracing::debug!(
            server_id = self.server_id,
            exe = %exe_path.display(),
            pid = ?child.id(),
            "Spawned MCP server process"
        );

        Ok((
            child,
            StdioPipes {
                stdin,
                stdout: BufReader::new(stdout),
            },
            stderr,
        ))
    }
}

async fn forward_stderr(server_id: i64, stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::debug!(server_id, line = %line, "MCP server stderr");
    }
}

/// Wait for the process to exit or for a kill request, then mark it dead.
async fn supervise(
    server_id: i64,
    mut child: Child,
    kill: oneshot::Receiver<()>,
    alive: Arc<AtomicBool>,
) {
    tokio::select! {
        status = child.wait() => match status {
            Ok(status) => tracing::warn!(server_id, %status, "MCP server process exited"),
            Err(e) => tracing::warn!(server_id, error = %e, "Lost track of MCP server process"),
        },
        _ = kill => {
            if let Err(e) = child.kill().await {
                tracing::debug!(server_id, error = %e, "MCP server process already gone");
            }
        }
    }
    alive.store(false, Ordering::SeqCst);
}

/// Read stdout until the response to `id` arrives.
async fn read_response(
    reader: &mut BufReader<ChildStdout>,
    id: u64,
) -> Result<JsonRpcMessage, McpClientError> {
    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line).await? == 0 {
            return Err(McpClientError::Protocol(
                "Server closed connection".to_string(),
            ));
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match serde_json::from_str::<JsonRpcMessage>(trimmed) {
            Ok(message) if message.answers(id) => return Ok(message),
            Ok(message) => {
                tracing::debug!(method = ?message.method, "Ignoring unrelated JSON-RPC message");
            }
            Err(_) => tracing::debug!(line = trimmed, "Skipping non-JSON-RPC output"),
        }
    }
}

impl StdioSession {
    async fn write_line(&self, line: &str) -> Result<(), McpClientError> {
        let mut pipes = self.pipes.lock().await;
        pipes.stdin.write_all(line.as_bytes()).await?;
        pipes.stdin.write_all(b"\n").await?;
        pipes.stdin.flush().await?;
        Ok(())
    }

    async fn notify(&self, method: &str) -> Result<(), McpClientError> {
        let line = serde_json::to_string(&JsonRpcNotification::new(method))?;
        self.write_line(&line).await
    }

    async fn initialize(&mut self, server_id: i64) -> Result<(), McpClientError> {
        let result = self
            .request("initialize", Some(protocol::initialize_params()))
            .await?;
        let init: InitializeResult = serde_json::from_value(result)?;

        tracing::debug!(
            server_id,
            protocol_version = %init.protocol_version,
            server_name = ?init.server_info.as_ref().map(|s| &s.name),
            server_version = ?init.server_info.as_ref().and_then(|s| s.version.as_ref()),
            "MCP session initialized"
        );

        self.capabilities = init.capabilities;
        self.notify("notifications/initialized").await
    }

    fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    async fn shutdown(mut self) {
        self.stderr_task.abort();
        if let Some(kill) = self.kill.take() {
            // Err means the supervisor already saw the process exit
            let _ = kill.send(());
        }
        if let Err(e) = self.supervisor.await {
            tracing::debug!(error = %e, "MCP process supervisor ended abnormally");
        }
    }
}

#[async_trait]
impl RpcChannel for StdioSession {
    async fn request(&self, method: &str, params: Option<Value>) -> Result<Value, McpClientError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let line = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        // One exchange at a time: the pipes carry a single ordered stream
        let mut pipes = self.pipes.lock().await;
        pipes.stdin.write_all(line.as_bytes()).await?;
        pipes.stdin.write_all(b"\n").await?;
        pipes.stdin.flush().await?;

        let response = tokio::time::timeout(self.request_timeout, read_response(&mut pipes.stdout, id))
            .await
            .map_err(|_| McpClientError::Timeout)??;

        response.into_result()
    }

    fn advertises_tools(&self) -> bool {
        self.capabilities.tools.is_some()
    }
}

#[async_trait]
impl McpClientPort for StdioClient {
    async fn connect(&mut self) -> Result<(), McpClientError> {
        if self.is_connected() {
            return Ok(());
        }
        if let Some(stale) = self.session.take() {
            stale.shutdown().await;
        }

        let (child, pipes, stderr) = self.spawn()?;
        let alive = Arc::new(AtomicBool::new(true));
        let (kill_tx, kill_rx) = oneshot::channel();
        let mut session = StdioSession {
            pipes: Mutex::new(pipes),
            next_id: AtomicU64::new(1),
            request_timeout: self.request_timeout,
            capabilities: ServerCapabilities::default(),
            stderr_task: tokio::spawn(forward_stderr(self.server_id, stderr)),
            alive: Arc::clone(&alive),
            kill: Some(kill_tx),
            supervisor: tokio::spawn(supervise(self.server_id, child, kill_rx, alive)),
        };

        match session.initialize(self.server_id).await {
            Ok(()) => {
                self.session = Some(session);
                Ok(())
            }
            Err(e) => {
                session.shutdown().await;
                Err(e)
            }
        }
    }

    async fn disconnect(&mut self) {
        if let Some(session) = self.session.take() {
            session.shutdown().await;
            tracing::debug!(server_id = self.server_id, "Stopped MCP server process");
        }
    }

    /// False once the process has exited, even before `disconnect`.
    fn is_connected(&self) -> bool {
        self.session.as_ref().is_some_and(StdioSession::is_alive)
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
