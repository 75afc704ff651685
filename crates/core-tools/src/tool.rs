// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolHandlerError;
use crate::schema::{ArgSchema, ValidArgs};

/// A single tool invocation, as it reaches the registry.
#[derive(Debug, Clone)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// A tool's normalized result (§4.4 step 4): structured results become
/// compact JSON text, strings pass through, oversized results are
/// truncated with a trailing marker.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub call_id: String,
    pub content: String,
    pub is_error: bool,
}

impl ToolOutput {
    pub fn ok(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    pub fn err(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}

/// A builtin, in-process tool handler. MCP-origin tools do not
/// implement this trait; the registry dispatches to `core-mcp` for
/// those directly (see `Origin`).
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn arg_schema(&self) -> ArgSchema;

    async fn execute(&self, args: ValidArgs) -> Result<String, ToolHandlerError>;
}
