// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ToolHandlerError(pub String);

impl From<std::io::Error> for ToolHandlerError {
    fn from(err: std::io::Error) -> Self {
        ToolHandlerError(err.to_string())
    }
}

/// Error taxonomy surfaced by the dispatcher (§7): caught by the
/// executor and recorded into a task's `error` rather than unwinding.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("tool not found: {name}")]
    ToolNotFound { name: String },

    #[error("argument error on `{tool}`: {source}")]
    ToolArgError {
        tool: String,
        #[source]
        source: crate::schema::ArgError,
    },

    #[error("tool `{tool}` timed out after {timeout_secs}s")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    #[error("transport error calling tool `{tool}`: {message}")]
    ToolTransportError { tool: String, message: String },

    #[error("handler error in tool `{tool}`: {source}")]
    ToolHandlerError {
        tool: String,
        #[source]
        source: ToolHandlerError,
    },
}
