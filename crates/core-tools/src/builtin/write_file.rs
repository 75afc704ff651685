// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;

use crate::error::ToolHandlerError;
use crate::schema::{ArgSchema, Field, FieldKind, ValidArgs};
use crate::tool::Tool;

/// Writes text content to a file, creating parent directories as
/// needed. Overwrites an existing file unless `append` is set.
pub struct WriteFileTool;

#[async_trait]
impl Tool for WriteFileTool {
    fn name(&self) -> &str {
        "write_file"
    }

    fn description(&self) -> &str {
        "Writes `content` to `path`, creating parent directories if \
         needed. Overwrites the file unless `append` is true."
    }

    fn arg_schema(&self) -> ArgSchema {
        ArgSchema::new(vec![
            Field::required("path", FieldKind::String, "file path to write"),
            Field::required("content", FieldKind::String, "text content to write"),
            Field::optional("append", FieldKind::Boolean, "append instead of overwrite"),
        ])
    }

    async fn execute(&self, args: ValidArgs) -> Result<String, ToolHandlerError> {
        let path = args
            .str("path")
            .ok_or_else(|| ToolHandlerError("path is required".into()))?;
        let content = args
            .str("content")
            .ok_or_else(|| ToolHandlerError("content is required".into()))?;
        let append = args.bool("append").unwrap_or(false);

        if let Some(parent) = std::path::Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        if append {
            use tokio::io::AsyncWriteExt;
            let mut file = tokio::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .await?;
            file.write_all(content.as_bytes()).await?;
        } else {
            tokio::fs::write(path, content).await?;
        }

        Ok(format!("wrote {} bytes to {path}", content.len()))
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
    async fn writes_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let tool = WriteFileTool;
        tool.execute(args(json!({ "path": path.to_str().unwrap(), "content": "hello" })))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
    }

    #[tokio::test]
    async fn overwrites_existing_file_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "old").unwrap();
        let tool = WriteFileTool;
        tool.execute(args(json!({ "path": path.to_str().unwrap(), "content": "new" })))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
    }

    #[tokio::test]
    async fn appends_when_flag_set() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        std::fs::write(&path, "a").unwrap();
        let tool = WriteFileTool;
        tool.execute(args(json!({ "path": path.to_str().unwrap(), "content": "b", "append": true })))
            .await
            .unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "ab");
    }

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/sub/out.txt");
        let tool = WriteFileTool;
        tool.execute(args(json!({ "path": path.to_str().unwrap(), "content": "x" })))
            .await
            .unwrap();
        assert!(path.is_file());
    }
}
