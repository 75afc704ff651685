// SPDX-License-Identifier: Apache-2.0
use std::path::Path;

use async_trait::async_trait;

use crate::error::ToolHandlerError;
use crate::schema::{ArgSchema, Field, FieldKind, ValidArgs};
use crate::tool::Tool;

const DEFAULT_DEPTH: i64 = 2;
const MAX_DEPTH: i64 = 5;
const DEFAULT_LIMIT: i64 = 100;
const EXCLUDED_DIRS: &[&str] = &[".git", "target", "node_modules", ".svn", "__pycache__", ".mypy_cache"];

/// Lists a directory's contents recursively up to a bounded depth,
/// directories first then alphabetical within each level.
pub struct ListDirectoryTool;

#[async_trait]
impl Tool for ListDirectoryTool {
    fn name(&self) -> &str {
        "list_directory"
    }

    fn description(&self) -> &str {
        "Lists files and subdirectories under `path`, recursing up to \
         `depth` levels (default 2, max 5), capped at `limit` entries \
         (default 100). Directories are listed before files and carry a \
         trailing `/`. Common build/vcs directories are skipped."
    }

    fn arg_schema(&self) -> ArgSchema {
        ArgSchema::new(vec![
            Field::required("path", FieldKind::String, "directory to list"),
            Field::optional("depth", FieldKind::Integer, "recursion depth, default 2, max 5"),
            Field::optional("limit", FieldKind::Integer, "maximum entries to return, default 100"),
        ])
    }

    async fn execute(&self, args: ValidArgs) -> Result<String, ToolHandlerError> {
        let path = args
            .str("path")
            .ok_or_else(|| ToolHandlerError("path is required".into()))?;
        let depth = args.i64("depth").unwrap_or(DEFAULT_DEPTH).clamp(0, MAX_DEPTH) as u32;
        let limit = args.i64("limit").unwrap_or(DEFAULT_LIMIT).max(1) as usize;

        let metadata = tokio::fs::metadata(path)
            .await
            .map_err(|e| ToolHandlerError(format!("{path}: {e}")))?;
        if !metadata.is_dir() {
            return Err(ToolHandlerError(format!("{path} is not a directory")));
        }

        let mut entries = Vec::new();
        collect_entries(Path::new(path), 0, depth, &mut entries, limit).await?;

        if entries.len() > limit {
            entries.truncate(limit);
            entries.push(format!("...[output truncated at {limit} entries]"));
        }
        Ok(entries.join("\n"))
    }
}

fn collect_entries<'a>(
    dir: &'a Path,
    current_depth: u32,
    max_depth: u32,
    out: &'a mut Vec<String>,
    limit: usize,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), ToolHandlerError>> + Send + 'a>> {
    Box::pin(async move {
        if out.len() > limit {
            return Ok(());
        }

        let mut read_dir = tokio::fs::read_dir(dir).await?;
        let mut dirs = Vec::new();
        let mut files = Vec::new();

        while let Some(entry) = read_dir.next_entry().await? {
            let name = entry.file_name().to_string_lossy().to_string();
            if EXCLUDED_DIRS.contains(&name.as_str()) {
                continue;
            }
            let file_type = entry.file_type().await?;
            if file_type.is_dir() {
                dirs.push((name, entry.path()));
            } else {
                files.push(name);
            }
        }
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        files.sort();

        for (name, child_path) in &dirs {
            out.push(format!("{}{name}/", "  ".repeat(current_depth as usize)));
            if current_depth + 1 < max_depth {
                collect_entries(child_path, current_depth + 1, max_depth, out, limit).await?;
            }
            if out.len() > limit {
                return Ok(());
            }
        }
        for name in files {
            out.push(format!("{}{name}", "  ".repeat(current_depth as usize)));
            if out.len() > limit {
                return Ok(());
            }
        }
        Ok(())
    })
}
