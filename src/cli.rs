// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;

use clap::Parser;

/// §6.3/§10: the process-level flags the core binary consumes. Everything
/// else about the turn loop (slash-command parsing, autocomplete, terminal
/// rendering) lives outside this crate's scope.
#[derive(Debug, Parser)]
#[command(name = "aria", about = "Hierarchical multi-agent orchestration core")]
pub struct Cli {
    /// Explicit configuration file path, highest precedence over the
    /// built-in search paths (core-config::loader).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Overrides the planner/finalizer model for this run (GPT_MODEL).
    #[arg(long)]
    pub model: Option<String>,

    /// Overrides the `.mcp.json` path for this run (MCP_CONFIG_PATH).
    #[arg(long = "mcp-config")]
    pub mcp_config: Option<PathBuf>,
}
