// SPDX-License-Identifier: Apache-2.0
use crate::schema::ArgSchema;

/// Which side of the dispatcher answers a call for a registered tool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    Builtin,
    Mcp(String),
}

/// `{name (unique), description, arg_schema, origin}` (§3 `ToolDescriptor`).
#[derive(Debug, Clone)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub arg_schema: ArgSchema,
    pub origin: Origin,
}
