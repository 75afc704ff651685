// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use regex::Regex;

use crate::error::ToolHandlerError;
use crate::schema::{ArgSchema, Field, FieldKind, ValidArgs};
use crate::tool::Tool;

const MAX_MATCHES: usize = 200;

/// Regex search over a single file's contents. Pure-Rust, no ripgrep
/// subprocess: the assistant's filesystem surface here is intentionally
/// narrower than a project-wide code search tool.
pub struct GrepTool;

#[async_trait]
impl Tool for GrepTool {
    fn name(&self) -> &str {
        "grep"
    }

    fn description(&self) -> &str {
        "Searches `path` line by line for matches of the regular \
         expression `pattern`, returning up to 200 matching lines \
         prefixed with their 1-based line number."
    }

    fn arg_schema(&self) -> ArgSchema {
        ArgSchema::new(vec![
            Field::required("path", FieldKind::String, "file to search"),
            Field::required("pattern", FieldKind::String, "regular expression"),
        ])
    }

    async fn execute(&self, args: ValidArgs) -> Result<String, ToolHandlerError> {
        let path = args
            .str("path")
            .ok_or_else(|| ToolHandlerError("path is required".into()))?;
        let pattern = args
            .str("pattern")
            .ok_or_else(|| ToolHandlerError("pattern is required".into()))?;

        let regex = Regex::new(pattern).map_err(|e| ToolHandlerError(format!("invalid pattern: {e}")))?;
        let contents = tokio::fs::read_to_string(path).await?;

        let mut matches = Vec::new();
        for (idx, line) in contents.lines().enumerate() {
            if regex.is_match(line) {
                matches.push(format!("{}:{line}", idx + 1));
                if matches.len() >= MAX_MATCHES {
                    matches.push(format!("...[truncated at {MAX_MATCHES} matches]"));
                    break;
                }
            }
        }

        if matches.is_empty() {
            Ok("no matches".to_string())
        } else {
            Ok(matches.join("\n"))
        }
    }
}
