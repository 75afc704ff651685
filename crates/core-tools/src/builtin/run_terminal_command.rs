// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;

use crate::error::ToolHandlerError;
use crate::schema::{ArgSchema, Field, FieldKind, ValidArgs};
use crate::tool::Tool;

/// Runs a shell command and returns its combined stdout/stderr. The
/// dispatcher's own per-call timeout (§4.4) bounds how long a runaway
/// command is allowed to run; this tool does not impose a second one.
pub struct RunTerminalCommandTool;

#[async_trait]
impl Tool for RunTerminalCommandTool {
    fn name(&self) -> &str {
        "run_terminal_command"
    }

    fn description(&self) -> &str {
        "Runs `command` in a shell and returns its exit status and \
         combined stdout/stderr. Optionally runs in `cwd` if given."
    }

    fn arg_schema(&self) -> ArgSchema {
        ArgSchema::new(vec![
            Field::required("command", FieldKind::String, "shell command to run"),
            Field::optional("cwd", FieldKind::String, "working directory"),
        ])
    }

    async fn execute(&self, args: ValidArgs) -> Result<String, ToolHandlerError> {
        let command = args
            .str("command")
            .ok_or_else(|| ToolHandlerError("command is required".into()))?;

        let mut cmd = tokio::process::Command::new("sh");
        cmd.arg("-c").arg(command);
        if let Some(cwd) = args.str("cwd") {
            cmd.current_dir(cwd);
        }

        let output = cmd.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let status = output.status.code().unwrap_or(-1);

        Ok(format!("exit status: {status}\nstdout:\n{stdout}\nstderr:\n{stderr}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    fn args(map: serde_json::Value) -> ValidArgs {
        ValidArgs(map.as_object().unwrap().clone().into_iter().collect::<HashMap<_, _>>())
    }

    #[tokio::test]
    async fn runs_simple_command_and_captures_stdout() {
        let tool = RunTerminalCommandTool;
        let result = tool.execute(args(json!({ "command": "echo hello" }))).await.unwrap();
        assert!(result.contains("exit status: 0"));
        assert!(result.contains("hello"));
    }

    #[tokio::test]
    async fn nonzero_exit_status_is_reported_not_errored() {
        let tool = RunTerminalCommandTool;
        let result = tool.execute(args(json!({ "command": "exit 7" }))).await.unwrap();
        assert!(result.contains("exit status: 7"));
    }

    #[tokio::test]
    async fn respects_cwd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let tool = RunTerminalCommandTool;
        let result = tool
            .execute(args(json!({ "command": "ls", "cwd": dir.path().to_str().unwrap() })))
            .await
            .unwrap();
        assert!(result.contains("marker.txt"));
    }
}
