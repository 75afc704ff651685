// SPDX-License-Identifier: Apache-2.0
pub mod descriptor;
pub mod error;
pub mod manager;
pub mod protocol;
pub mod session;

pub use descriptor::json_schema_to_arg_schema;
pub use error::McpError;
pub use manager::SubprocessManager;
pub use protocol::{Notification, Request, Response, RpcError};
pub use session::{MCPSession, SessionStatus};
