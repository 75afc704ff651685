// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin};
use tokio::sync::{oneshot, Mutex, RwLock};

use core_config::MCPServerConfig;
use core_log::{Level, LogRecord, LogSink};
use core_tools::ToolDescriptor;

use crate::descriptor::json_schema_to_arg_schema;
use crate::error::McpError;
use crate::protocol::{Notification, Request, Response};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Starting,
    Ready,
    Failed,
    Stopped,
}

type Waiters = Arc<Mutex<HashMap<u64, oneshot::Sender<Response>>>>;

/// Runtime peer of an [`MCPServerConfig`] (§3 `MCPSession`): a child
/// process plus the request/response plumbing needed to call its tools.
///
/// Call semantics per §4.2: a single writer mutex around `stdin`
/// guarantees frames are never interleaved; a single reader task (spawned
/// in [`MCPSession::start`]) demultiplexes responses into `waiters` by
/// id; each call races its own `tokio::time::timeout`.
pub struct MCPSession {
    pub config: MCPServerConfig,
    status: RwLock<SessionStatus>,
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    next_id: AtomicU64,
    waiters: Waiters,
    tools: RwLock<Vec<ToolDescriptor>>,
    call_timeout: Duration,
    reader_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
    stderr_handle: Mutex<Option<tokio::task::JoinHandle<()>>>,
}

impl MCPSession {
    pub fn new(config: MCPServerConfig, call_timeout: Duration) -> Self {
        Self {
            config,
            status: RwLock::new(SessionStatus::Starting),
            child: Mutex::new(None),
            stdin: Mutex::new(None),
            next_id: AtomicU64::new(1),
            waiters: Arc::new(Mutex::new(HashMap::new())),
            tools: RwLock::new(Vec::new()),
            call_timeout,
            reader_handle: Mutex::new(None),
            stderr_handle: Mutex::new(None),
        }
    }

    pub async fn status(&self) -> SessionStatus {
        *self.status.read().await
    }

    pub async fn tools(&self) -> Vec<ToolDescriptor> {
        self.tools.read().await.clone()
    }

    /// Spawns the child process, performs the handshake (`initialize` →
    /// `notifications/initialized` → `tools/list`) per §4.2, and leaves
    /// the session `Ready` with its tool list populated. On any failure
    /// the session is left `Failed` and the error is returned to the
    /// caller, which (per §7) logs it and proceeds without this server's
    /// tools rather than aborting the others.
    pub async fn start(
        self: &Arc<Self>,
        startup_timeout: Duration,
        log_sink: Option<Arc<LogSink>>,
    ) -> Result<(), McpError> {
        tokio::time::timeout(startup_timeout, self.start_inner(log_sink))
            .await
            .unwrap_or_else(|_| {
                Err(McpError::ServerStartupError {
                    server_id: self.config.id.clone(),
                    message: format!("handshake exceeded {startup_timeout:?}"),
                })
            })
    }

    async fn start_inner(self: &Arc<Self>, log_sink: Option<Arc<LogSink>>) -> Result<(), McpError> {
        let mut command = tokio::process::Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .envs(&self.config.env)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped());
        if let Some(cwd) = &self.config.cwd {
            command.current_dir(cwd);
        }

        let mut child = command.spawn().map_err(|e| McpError::ServerStartupError {
            server_id: self.config.id.clone(),
            message: e.to_string(),
        })?;

        let stdin = child.stdin.take().expect("piped stdin");
        let stdout = child.stdout.take().expect("piped stdout");
        let stderr = child.stderr.take().expect("piped stderr");

        *self.stdin.lock().await = Some(stdin);

        let reader_handle = spawn_reader(
            self.config.id.clone(),
            stdout,
            Arc::clone(&self.waiters),
            Arc::clone(self),
        );
        *self.reader_handle.lock().await = Some(reader_handle);

        if let Some(sink) = log_sink {
            let stderr_handle = spawn_stderr_capture(self.config.id.clone(), stderr, sink);
            *self.stderr_handle.lock().await = Some(stderr_handle);
        }

        *self.child.lock().await = Some(child);

        self.send_request(
            "initialize",
            json!({ "capabilities": {}, "clientInfo": { "name": "aria", "version": "0.1.0" } }),
        )
        .await
        .map_err(|e| McpError::ServerStartupError {
            server_id: self.config.id.clone(),
            message: e.to_string(),
        })?;

        self.send_notification("notifications/initialized", json!({}))
            .await
            .map_err(|e| McpError::ServerStartupError {
                server_id: self.config.id.clone(),
                message: e.to_string(),
            })?;

        let list_result = self
            .send_request("tools/list", json!({}))
            .await
            .map_err(|e| McpError::ServerStartupError {
                server_id: self.config.id.clone(),
                message: e.to_string(),
            })?;

        let tools = parse_tools_list(&list_result);
        *self.tools.write().await = tools;
        *self.status.write().await = SessionStatus::Ready;
        Ok(())
    }

    async fn send_notification(&self, method: &str, params: Value) -> Result<(), McpError> {
        let notification = Notification::new(method, params);
        let line = notification.to_line().map_err(|e| McpError::ToolTransportError {
            server_id: self.config.id.clone(),
            message: e.to_string(),
        })?;
        self.write_line(&line).await
    }

    async fn write_line(&self, line: &str) -> Result<(), McpError> {
        let mut guard = self.stdin.lock().await;
        let stdin = guard.as_mut().ok_or_else(|| McpError::ToolTransportError {
            server_id: self.config.id.clone(),
            message: "session has no stdin handle".to_string(),
        })?;
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| McpError::ToolTransportError {
                server_id: self.config.id.clone(),
                message: e.to_string(),
            })?;
        stdin
            .write_all(b"\n")
            .await
            .map_err(|e| McpError::ToolTransportError {
                server_id: self.config.id.clone(),
                message: e.to_string(),
            })
    }

    async fn send_request(&self, method: &str, params: Value) -> Result<Value, McpError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.waiters.lock().await.insert(id, tx);

        let request = Request::new(id, method, params);
        let line = request.to_line().map_err(|e| McpError::ToolTransportError {
            server_id: self.config.id.clone(),
            message: e.to_string(),
        })?;

        if let Err(err) = self.write_line(&line).await {
            self.waiters.lock().await.remove(&id);
            return Err(err);
        }

        match tokio::time::timeout(self.call_timeout, rx).await {
            Ok(Ok(response)) => response.into_result().map_err(|rpc_error| McpError::ToolHandlerError {
                server_id: self.config.id.clone(),
                tool: method.to_string(),
                message: rpc_error.message,
            }),
            Ok(Err(_)) => Err(McpError::ToolTransportError {
                server_id: self.config.id.clone(),
                message: "reader task dropped the waiter channel".to_string(),
            }),
            Err(_) => {
                self.waiters.lock().await.remove(&id);
                Err(McpError::ToolTimeout {
                    server_id: self.config.id.clone(),
                    tool: method.to_string(),
                })
            }
        }
    }

    pub async fn call(&self, tool_name: &str, args: Value) -> Result<Value, McpError> {
        let status = self.status().await;
        if status != SessionStatus::Ready {
            return Err(McpError::ToolTransportError {
                server_id: self.config.id.clone(),
                message: format!("session is not ready (status: {status:?})"),
            });
        }
        self.send_request("tools/call", json!({ "name": tool_name, "arguments": args }))
            .await
    }

    async fn mark_failed(&self) {
        *self.status.write().await = SessionStatus::Failed;
        let mut waiters = self.waiters.lock().await;
        for (_, tx) in waiters.drain() {
            let _ = tx.send(Response {
                id: None,
                result: None,
                error: Some(crate::protocol::RpcError {
                    code: -1,
                    message: "transport closed".to_string(),
                    data: None,
                }),
            });
        }
    }

    /// Orderly, idempotent shutdown (§4.2): best-effort `exit`
    /// notification, then terminate, then join.
    pub async fn shutdown(&self) {
        if *self.status.read().await == SessionStatus::Stopped {
            return;
        }
        let _ = self.send_notification("exit", json!({})).await;

        if let Some(mut child) = self.child.lock().await.take() {
            let _ = child.start_kill();
            let _ = child.wait().await;
        }
        if let Some(handle) = self.reader_handle.lock().await.take() {
            handle.abort();
        }
        if let Some(handle) = self.stderr_handle.lock().await.take() {
            handle.abort();
        }
        *self.status.write().await = SessionStatus::Stopped;
    }
}

fn spawn_reader(
    server_id: String,
    stdout: tokio::process::ChildStdout,
    waiters: Waiters,
    session: Arc<MCPSession>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stdout).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim_start_matches('\u{feff}');
                    if line.trim().is_empty() {
                        continue;
                    }
                    match Response::from_line(line) {
                        Ok(response) => {
                            if let Some(id) = response.id {
                                if let Some(tx) = waiters.lock().await.remove(&id) {
                                    let _ = tx.send(response);
                                }
                                // Unknown id: discarded and logged per §8 invariant.
                            }
                        }
                        Err(_) => {
                            tracing::warn!(target: "MCP", server_id = %server_id, "failed to decode line, skipping");
                        }
                    }
                }
                Ok(None) => {
                    session.mark_failed().await;
                    break;
                }
                Err(_) => {
                    session.mark_failed().await;
                    break;
                }
            }
        }
    })
}

fn spawn_stderr_capture(
    server_id: String,
    stderr: tokio::process::ChildStderr,
    log_sink: Arc<LogSink>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log_sink.emit(LogRecord::new(
                Level::Info,
                format!("MCP stderr: {server_id}"),
                line,
            ));
        }
    })
}

fn parse_tools_list(result: &Value) -> Vec<ToolDescriptor> {
    let Some(tools) = result.get("tools").and_then(Value::as_array) else {
        return Vec::new();
    };
    tools
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?.to_string();
            let description = entry
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let arg_schema = entry
                .get("inputSchema")
                .map(json_schema_to_arg_schema)
                .unwrap_or_default();
            Some(ToolDescriptor {
                name,
                description,
                arg_schema,
                origin: core_tools::Origin::Mcp(String::new()),
            })
        })
        .collect()
}
