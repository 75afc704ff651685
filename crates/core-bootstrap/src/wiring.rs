// SPDX-License-Identifier: Apache-2.0
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use core_config::{Config, StaticResolver};
use core_llm::LlmGateway;
use core_log::LogSink;
use core_mcp::SubprocessManager;
use core_tools::builtin::{GrepTool, ListDirectoryTool, ReadFileTool, RunTerminalCommandTool, WriteFileTool};
use core_tools::ToolRegistry;
use core_workflow::{ConversationStore, RequestRouter};

use crate::error::StartupError;

const SHUTDOWN_STEP_TIMEOUT: Duration = Duration::from_secs(10);

/// Every process-level singleton the orchestration core needs, built in
/// the exact order §4.9 prescribes and torn down in reverse. Nothing here
/// is a global or a lazily-initialized static; a caller holds one
/// `Wiring` value for the lifetime of the process.
pub struct Wiring {
    pub log_sink: Arc<LogSink>,
    pub conversation: ConversationStore,
    pub gateway: LlmGateway,
    pub tools: ToolRegistry,
    pub mcp: Arc<SubprocessManager>,
    pub classifier_model: String,
    pub planner_model: String,
    pub max_depth: u32,
    pub max_attempts: u32,
}

impl Wiring {
    /// §4.9 startup order: log sinks, conversation store, LLM gateway,
    /// builtin tool registration, MCP config load, MCP server start plus
    /// tool merge, router construction. A failure at any step aborts the
    /// remaining steps and is reported to the caller untouched; nothing
    /// already constructed is torn down here, since the caller that
    /// receives the `Err` never obtains a `Wiring` to call `shutdown` on.
    pub async fn init(config: &Config) -> Result<Self, StartupError> {
        let log_sink = Arc::new(LogSink::init(&config.logging.log_dir, config.logging.rotate_bytes)?);
        info!(target: "AGENT", "log sinks ready at {}", config.logging.log_dir.display());

        let conversation = ConversationStore::new();
        info!(target: "AGENT", conversation_id = %conversation.id(), "conversation store ready");

        let gateway = LlmGateway::new(&config.model)?;
        info!(target: "AGENT", "llm gateway ready");

        let mut tools = ToolRegistry::new(config.tools.default_timeout());
        register_builtin_tools(&mut tools);
        info!(target: "AGENT", count = tools.list().len(), "builtin tools registered");

        let mcp_configs = load_mcp_servers(config)?;

        let mut mcp = SubprocessManager::new();
        if !mcp_configs.is_empty() {
            let outcomes = mcp
                .start_all(mcp_configs, config.mcp.timeout(), Some(log_sink.clone()))
                .await;
            for (server_id, outcome) in outcomes {
                match outcome {
                    Ok(()) => {
                        for descriptor in mcp.discover_tools(&server_id).await {
                            tools.register_mcp_tool(&server_id, descriptor);
                        }
                        info!(target: "MCP_SERVER", server_id = %server_id, "server started and tools merged");
                    }
                    Err(err) => {
                        warn!(target: "MCP_SERVER", server_id = %server_id, error = %err, "server failed to start, skipping");
                    }
                }
            }
        }
        let mcp = Arc::new(mcp);
        tools.set_mcp_caller(mcp.clone());

        tools.freeze();
        info!(target: "AGENT", count = tools.list().len(), "tool registry frozen, router ready to construct");

        Ok(Self {
            log_sink,
            conversation,
            gateway,
            tools,
            mcp,
            classifier_model: config.model.classifier_model.clone(),
            planner_model: config.model.planner_model.clone(),
            max_depth: config.agent.max_depth,
            max_attempts: config.agent.max_attempts,
        })
    }

    pub fn router(&self) -> RequestRouter<'_> {
        RequestRouter::new(
            &self.gateway,
            &self.tools,
            &self.conversation,
            self.classifier_model.clone(),
            self.planner_model.clone(),
            self.max_depth,
            self.max_attempts,
        )
    }

    /// Reverses §4.9's startup order. Each step is timeout-bounded and
    /// failure-tolerant: a step that hangs or errors is logged and
    /// skipped rather than propagated, since shutdown must make forward
    /// progress regardless of what state a singleton was left in.
    pub async fn shutdown(self) {
        if tokio::time::timeout(SHUTDOWN_STEP_TIMEOUT, self.mcp.shutdown()).await.is_err() {
            warn!(target: "AGENT", "mcp shutdown timed out");
        }
        info!(target: "AGENT", "shutdown complete");
    }
}

fn register_builtin_tools(tools: &mut ToolRegistry) {
    let builtins: Vec<Arc<dyn core_tools::Tool>> = vec![
        Arc::new(ReadFileTool),
        Arc::new(WriteFileTool),
        Arc::new(GrepTool),
        Arc::new(ListDirectoryTool),
        Arc::new(RunTerminalCommandTool),
    ];
    for tool in builtins {
        tools.register(tool).expect("builtin tool registration is infallible before startup completes");
    }
}

/// A missing `.mcp.json` at the configured path means "no MCP servers
/// configured," not a fatal error: most runs never touch MCP at all. A
/// file that exists but fails to parse or resolve is still fatal (§7).
fn load_mcp_servers(config: &Config) -> Result<Vec<core_config::MCPServerConfig>, StartupError> {
    if !config.mcp.config_path.exists() {
        return Ok(Vec::new());
    }
    let mut resolver = StaticResolver(std::collections::HashMap::new());
    core_config::load_mcp_config(&config.mcp.config_path, &mut resolver).map_err(StartupError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config(log_dir: std::path::PathBuf) -> Config {
        let mut config = Config::default();
        config.logging.log_dir = log_dir;
        config.mcp.config_path = std::path::PathBuf::from("/nonexistent/.mcp.json");
        config
    }

    #[tokio::test]
    async fn init_builds_every_singleton_in_order_with_no_mcp_servers() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());

        let wiring = Wiring::init(&config).await.unwrap();
        assert!(wiring.tools.list().len() >= 5);
        assert!(wiring.mcp.server_ids().is_empty());
        wiring.shutdown().await;
    }

    #[tokio::test]
    async fn router_is_constructible_after_init() {
        let dir = tempfile::tempdir().unwrap();
        let config = test_config(dir.path().to_path_buf());

        let wiring = Wiring::init(&config).await.unwrap();
        let _router = wiring.router();
        wiring.shutdown().await;
    }
}
