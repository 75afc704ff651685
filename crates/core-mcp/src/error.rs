// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// §7: per-server startup failures don't abort peers; call-level errors
/// are surfaced to the dispatcher.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("server `{server_id}` failed to start: {message}")]
    ServerStartupError { server_id: String, message: String },

    #[error("tool `{tool}` on server `{server_id}` timed out")]
    ToolTimeout { server_id: String, tool: String },

    #[error("transport error on server `{server_id}`: {message}")]
    ToolTransportError { server_id: String, message: String },

    #[error("server `{server_id}` returned an error for `{tool}`: {message}")]
    ToolHandlerError {
        server_id: String,
        tool: String,
        message: String,
    },

    #[error("unknown server `{0}`")]
    UnknownServer(String),
}
