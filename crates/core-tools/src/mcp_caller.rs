// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::Value;

/// The dispatcher's view of the Subprocess/MCP Manager (C2): just
/// enough to route an `Origin::Mcp` call, so `core-tools` never depends
/// on `core-mcp` directly. `core-mcp`'s `SubprocessManager` implements
/// this; the wiring layer (`core-bootstrap`) is what actually connects
/// the two, keeping the dependency edge one-directional.
#[async_trait]
pub trait McpCaller: Send + Sync {
    async fn call(&self, server_id: &str, tool_name: &str, args: Value) -> Result<Value, McpCallError>;
}

#[derive(Debug, Clone)]
pub struct McpCallError {
    pub message: String,
    pub is_timeout: bool,
}

impl std::fmt::Display for McpCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for McpCallError {}
