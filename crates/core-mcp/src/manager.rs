// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use core_config::MCPServerConfig;
use core_log::LogSink;
use core_tools::{McpCallError, McpCaller, Origin, ToolDescriptor};

use crate::error::McpError;
use crate::session::{MCPSession, SessionStatus};

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);

/// Owns every configured [`MCPSession`] and is the adapter side of the
/// `core-tools` `McpCaller` port, closing the hexagonal edge described in
/// `core-tools::mcp_caller` (`core-mcp` depends on `core-tools`, never the
/// reverse).
pub struct SubprocessManager {
    sessions: HashMap<String, Arc<MCPSession>>,
}

impl SubprocessManager {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Starts every configured server concurrently (§4.2: one server's
    /// startup failure never blocks or aborts its peers). Returns the
    /// per-server outcome in the same order as `configs`.
    pub async fn start_all(
        &mut self,
        configs: Vec<MCPServerConfig>,
        call_timeout: Duration,
        log_sink: Option<Arc<LogSink>>,
    ) -> Vec<(String, Result<(), McpError>)> {
        let futures = configs.into_iter().map(|config| {
            let log_sink = log_sink.clone();
            async move {
                let server_id = config.id.clone();
                let session = Arc::new(MCPSession::new(config, call_timeout));
                let result = session.start(DEFAULT_STARTUP_TIMEOUT, log_sink).await;
                (server_id, session, result)
            }
        });

        let outcomes = futures::future::join_all(futures).await;
        let mut results = Vec::with_capacity(outcomes.len());
        for (server_id, session, result) in outcomes {
            if result.is_ok() {
                self.sessions.insert(server_id.clone(), session);
            }
            results.push((server_id, result));
        }
        results
    }

    /// Tool descriptors discovered from a single server, namespaced to
    /// `origin = Mcp(server_id)` so the registry can merge them with
    /// collision handling (§4.2 handshake step 5).
    pub async fn discover_tools(&self, server_id: &str) -> Vec<ToolDescriptor> {
        let Some(session) = self.sessions.get(server_id) else {
            return Vec::new();
        };
        session
            .tools()
            .await
            .into_iter()
            .map(|descriptor| ToolDescriptor {
                origin: Origin::Mcp(server_id.to_string()),
                ..descriptor
            })
            .collect()
    }

    pub fn server_ids(&self) -> Vec<String> {
        self.sessions.keys().cloned().collect()
    }

    pub async fn session_status(&self, server_id: &str) -> Option<SessionStatus> {
        match self.sessions.get(server_id) {
            Some(session) => Some(session.status().await),
            None => None,
        }
    }

    pub async fn shutdown(&self) {
        for session in self.sessions.values() {
            session.shutdown().await;
        }
    }
}

impl Default for SubprocessManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl McpCaller for SubprocessManager {
    async fn call(&self, server_id: &str, tool_name: &str, args: Value) -> Result<Value, McpCallError> {
        let session = self.sessions.get(server_id).ok_or_else(|| McpCallError {
            message: format!("unknown mcp server `{server_id}`"),
            is_timeout: false,
        })?;
        session.call(tool_name, args).await.map_err(|err| {
            let is_timeout = matches!(err, McpError::ToolTimeout { .. });
            McpCallError {
                message: err.to_string(),
                is_timeout,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unknown_server_call_is_an_error() {
        let manager = SubprocessManager::new();
        let result = manager.call("ghost", "whatever", Value::Null).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn discover_tools_on_unknown_server_is_empty() {
        let manager = SubprocessManager::new();
        assert!(manager.discover_tools("ghost").await.is_empty());
    }

    #[tokio::test]
    async fn start_all_reports_failure_for_nonexistent_command() {
        let mut manager = SubprocessManager::new();
        let config = MCPServerConfig {
            id: "broken".to_string(),
            command: "/no/such/binary-aria-test".to_string(),
            args: vec![],
            env: HashMap::new(),
            cwd: None,
        };
        let results = manager
            .start_all(vec![config], Duration::from_secs(1), None)
            .await;
        assert_eq!(results.len(), 1);
        assert!(results[0].1.is_err());
        assert!(manager.server_ids().is_empty());
    }
}
