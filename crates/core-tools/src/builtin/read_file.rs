// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;

use crate::error::ToolHandlerError;
use crate::schema::{ArgSchema, Field, FieldKind, ValidArgs};
use crate::tool::Tool;

const DEFAULT_LINE_LIMIT: usize = 200;

/// Reads a text file from disk, optionally paginated by line range.
/// Binary content is reported rather than dumped raw.
pub struct ReadFileTool;

#[async_trait]
impl Tool for ReadFileTool {
    fn name(&self) -> &str {
        "read_file"
    }

    fn description(&self) -> &str {
        "Reads a UTF-8 text file and returns its contents. Accepts an \
         optional `offset` (0-based starting line) and `limit` (max lines, \
         default 200) for paginating large files. Returns an error if the \
         path does not exist, is a directory, or is not valid UTF-8."
    }

    fn arg_schema(&self) -> ArgSchema {
        ArgSchema::new(vec![
            Field::required("path", FieldKind::String, "file path to read"),
            Field::optional("offset", FieldKind::Integer, "0-based starting line"),
            Field::optional("limit", FieldKind::Integer, "maximum number of lines to return"),
        ])
    }

    async fn execute(&self, args: ValidArgs) -> Result<String, ToolHandlerError> {
        let path = args
            .str("path")
            .ok_or_else(|| ToolHandlerError("path is required".into()))?;
        let offset = args.i64("offset").unwrap_or(0).max(0) as usize;
        let limit = args.i64("limit").unwrap_or(DEFAULT_LINE_LIMIT as i64).max(1) as usize;

        let metadata = tokio::fs::metadata(path).await?;
        if metadata.is_dir() {
            return Err(ToolHandlerError(format!("{path} is a directory, not a file")));
        }

        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ToolHandlerError(format!("{path} is not valid UTF-8: {e}")))?;

        let lines: Vec<&str> = contents.lines().collect();
        let end = (offset + limit).min(lines.len());
        let slice = if offset >= lines.len() {
            String::new()
        } else {
            lines[offset..end].join("\n")
        };

        if end < lines.len() {
            Ok(format!(
                "{slice}\n...[{} more lines; increase `limit` or `offset` to continue]",
                lines.len() - end
            ))
        } else {
            Ok(slice)
        }
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
    async fn reads_whole_small_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "line1\nline2\nline3\n").unwrap();

        let tool = ReadFileTool;
        let result = tool
            .execute(args(json!({ "path": file.path().to_str().unwrap() })))
            .await
            .unwrap();
        assert_eq!(result, "line1\nline2\nline3");
    }

    #[tokio::test]
    async fn paginates_with_offset_and_limit() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let content = (0..10).map(|i| format!("line{i}")).collect::<Vec<_>>().join("\n");
        std::fs::write(file.path(), content).unwrap();

        let tool = ReadFileTool;
        let result = tool
            .execute(args(json!({
                "path": file.path().to_str().unwrap(),
                "offset": 2,
                "limit": 3
            })))
            .await
            .unwrap();
        assert!(result.starts_with("line2\nline3\nline4"));
        assert!(result.contains("more lines"));
    }

    #[tokio::test]
    async fn directory_path_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let tool = ReadFileTool;
        let result = tool.execute(args(json!({ "path": dir.path().to_str().unwrap() }))).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn nonexistent_path_is_error() {
        let tool = ReadFileTool;
        let result = tool.execute(args(json!({ "path": "/nonexistent/file.txt" }))).await;
        assert!(result.is_err());
    }
}
