// SPDX-License-Identifier: Apache-2.0
//! Typed configuration for the orchestration core.
//!
//! Owns two independent concerns: the process-wide [`schema::Config`]
//! (model endpoints, MCP defaults, tool limits, logging), loaded by
//! [`loader::load`]; and the `.mcp.json` server configuration document
//! (§6.1), parsed and placeholder-resolved by [`mcp::load_mcp_config`].

mod error;
mod loader;
mod mcp;
mod schema;

pub use error::ConfigError;
pub use loader::load;
pub use mcp::{
    load_mcp_config, MCPServerConfig, McpConfigDocument, McpInputSpec, McpServerSpec,
    PromptResolver, StaticResolver,
};
pub use schema::{
    AgentConfig, Config, EndpointConfig, LoggingConfig, McpConfig, ModelConfig, ToolsConfig,
};
