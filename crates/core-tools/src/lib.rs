// SPDX-License-Identifier: Apache-2.0
//! Tool Registry & Dispatcher (C4): builtin tools, the typed argument
//! schema, and the five-step invocation contract (resolve, validate,
//! dispatch, normalize, log).

pub mod builtin;
mod descriptor;
mod error;
mod mcp_caller;
mod registry;
mod schema;
mod tool;

pub use descriptor::{Origin, ToolDescriptor};
pub use error::{ToolError, ToolHandlerError};
pub use mcp_caller::{McpCallError, McpCaller};
pub use registry::ToolRegistry;
pub use schema::{validate, ArgError, ArgSchema, Either, Field, FieldKind, ValidArgs};
pub use tool::{Tool, ToolCall, ToolOutput};
