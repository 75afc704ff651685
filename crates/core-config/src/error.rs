// SPDX-License-Identifier: Apache-2.0
use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or resolving configuration.
///
/// Fatal at startup (§7): the wiring layer maps any `ConfigError` to a
/// non-zero exit code and never attempts to proceed with a partial config.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("reading MCP config document {path}: {source}")]
    McpRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing MCP config document {path}: {source}")]
    McpParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// An `env.%NAME%` placeholder in an MCP server's `env` block could not
    /// be resolved against `inputs` or the process environment (§6.1).
    #[error("server {server_id:?} references unresolved placeholder %{name}%")]
    UnresolvedPlaceholder { server_id: String, name: String },
}
