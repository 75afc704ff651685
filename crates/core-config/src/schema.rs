// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level configuration consumed by the orchestration core.
///
/// `core-config` is the sole producer of this type; every other crate
/// only ever sees the typed value, never a raw file or env var, matching
/// spec.md's framing of configuration loading as an external collaborator
/// whose only contract with the core is "produces typed config values".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub mcp: McpConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            mcp: McpConfig::default(),
            tools: ToolsConfig::default(),
            agent: AgentConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// One HTTP-reachable model endpoint (§4.3: "local" or "cloud").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_connect_timeout_secs() -> u64 {
    10
}

impl EndpointConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

/// Model selection and rate-limit configuration for the LLM Gateway (C3).
///
/// `cloud` and `local` are the two endpoint kinds named in §4.3; model
/// selection (§4.3 "Selection") is a pure function of the model name
/// requested by a caller, implemented in `core-llm`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default = "default_cloud_endpoint")]
    pub cloud: EndpointConfig,
    #[serde(default = "default_local_endpoint")]
    pub local: EndpointConfig,
    /// `GPT_MODEL` — model used by the planner and finalizer.
    #[serde(default = "default_planner_model")]
    pub planner_model: String,
    /// `CLASSIFIER_MODEL` — model used by the request router's classifier
    /// and by the flat tool-selector.
    #[serde(default = "default_classifier_model")]
    pub classifier_model: String,
    /// `MAX_REQUESTS_PER_MINUTE` — sliding-window cap shared by every
    /// endpoint's `RateBudget` (§3, §4.3).
    #[serde(default = "default_max_rpm")]
    pub max_requests_per_minute: u32,
}

fn default_cloud_endpoint() -> EndpointConfig {
    EndpointConfig {
        base_url: "https://api.openai.com/v1".into(),
        api_key: None,
        timeout_secs: default_timeout_secs(),
        connect_timeout_secs: default_connect_timeout_secs(),
    }
}

fn default_local_endpoint() -> EndpointConfig {
    EndpointConfig {
        base_url: "http://localhost:11434".into(),
        api_key: None,
        timeout_secs: default_timeout_secs(),
        connect_timeout_secs: default_connect_timeout_secs(),
    }
}

fn default_planner_model() -> String {
    "gpt-4o-mini".into()
}

fn default_classifier_model() -> String {
    "gpt-4o-mini".into()
}

fn default_max_rpm() -> u32 {
    30
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            cloud: default_cloud_endpoint(),
            local: default_local_endpoint(),
            planner_model: default_planner_model(),
            classifier_model: default_classifier_model(),
            max_requests_per_minute: default_max_rpm(),
        }
    }
}

/// Configuration for the Subprocess/MCP Manager (C2, §6.1, §6.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpConfig {
    /// `MCP_CONFIG_PATH` — defaults to `./.mcp.json`.
    #[serde(default = "default_mcp_config_path")]
    pub config_path: PathBuf,
    /// `MCP_TIMEOUT` — per-server startup timeout and per-call deadline,
    /// in seconds. Default 30s for both, per §4.2.
    #[serde(default = "default_mcp_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_mcp_config_path() -> PathBuf {
    PathBuf::from("./.mcp.json")
}

fn default_mcp_timeout_secs() -> u64 {
    30
}

impl Default for McpConfig {
    fn default() -> Self {
        Self {
            config_path: default_mcp_config_path(),
            timeout_secs: default_mcp_timeout_secs(),
        }
    }
}

impl McpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Dispatcher-level tool defaults (C4, §4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "default_tool_timeout_secs")]
    pub default_timeout_secs: u64,
    #[serde(default = "default_max_result_bytes")]
    pub max_result_bytes: usize,
}

fn default_tool_timeout_secs() -> u64 {
    30
}

fn default_max_result_bytes() -> usize {
    64 * 1024
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            default_timeout_secs: default_tool_timeout_secs(),
            max_result_bytes: default_max_result_bytes(),
        }
    }
}

impl ToolsConfig {
    pub fn default_timeout(&self) -> Duration {
        Duration::from_secs(self.default_timeout_secs)
    }
}

/// Hierarchical Workflow Engine defaults (C7, §3, §4.7).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_max_depth() -> u32 {
    4
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            max_depth: default_max_depth(),
        }
    }
}

/// LogSink & Router configuration (C1, §6.4, §6.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `LOG_DIR` — default `./basic_logs/`.
    #[serde(default = "default_log_dir")]
    pub log_dir: PathBuf,
    /// `LOG_LEVEL` — default `info`.
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Per-file rotation cap in bytes, default 8 MiB (§6.5).
    #[serde(default = "default_rotate_bytes")]
    pub rotate_bytes: u64,
}

fn default_log_dir() -> PathBuf {
    PathBuf::from("./basic_logs")
}

fn default_log_level() -> String {
    "info".into()
}

fn default_rotate_bytes() -> u64 {
    8 * 1024 * 1024
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_level: default_log_level(),
            rotate_bytes: default_rotate_bytes(),
        }
    }
}
