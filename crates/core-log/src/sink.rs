// SPDX-License-Identifier: Apache-2.0
use std::cell::Cell;
use std::path::Path;

use crate::handler::CategoryHandler;
use crate::record::{Category, LogRecord};

thread_local! {
    /// Recursion guard (§4.1): if a handler itself emits a record while
    /// already inside `LogSink::emit`, that nested record is written raw
    /// (bypassing the normal handler fan-out) and the guard is released
    /// immediately after, rather than deadlocking or looping forever.
    static EMITTING: Cell<bool> = Cell::new(false);
}

/// Owns one handler per category and fans each record out to every
/// handler whose predicate matches. Construction never fails loudly for
/// an individual category: a handler that can't open its file is simply
/// omitted, and future records for that category are dropped (logged
/// nowhere) rather than panicking the process at startup.
pub struct LogSink {
    handlers: Vec<CategoryHandler>,
}

impl LogSink {
    pub fn init(log_dir: &Path, rotate_bytes: u64) -> std::io::Result<Self> {
        let categories = [
            Category::McpServer,
            Category::ApiCall,
            Category::ToolExecution,
            Category::AgentWorkflow,
            Category::ErrorTraceback,
            Category::Other,
        ];
        let mut handlers = Vec::with_capacity(categories.len());
        for category in categories {
            handlers.push(CategoryHandler::new(log_dir, category, rotate_bytes)?);
        }
        Ok(Self { handlers })
    }

    /// Never blocks the caller on I/O beyond the handlers' own buffered
    /// file writes, and never raises to the caller (§4.1 contract).
    pub fn emit(&self, record: LogRecord) {
        if EMITTING.with(|flag| flag.replace(true)) {
            // Already inside emit on this thread: write raw to the one
            // matching handler and bail, per the recursion guard.
            if let Some(handler) = self.handlers.iter().find(|h| h.should_handle(&record)) {
                handler.handle(&record);
            }
            EMITTING.with(|flag| flag.set(true));
            return;
        }

        for handler in &self.handlers {
            if handler.should_handle(&record) {
                handler.handle(&record);
            }
        }

        EMITTING.with(|flag| flag.set(false));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Level;

    #[test]
    fn emit_routes_to_matching_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::init(dir.path(), 1024 * 1024).unwrap();
        sink.emit(LogRecord::new(Level::Info, "TOOL grep", "ran"));

        let tool_log = std::fs::read_to_string(dir.path().join("log_TOOL_EXECUTION.txt")).unwrap();
        assert!(tool_log.contains("TOOL grep"));

        let other_log = std::fs::read_to_string(dir.path().join("log_OTHER.txt")).unwrap();
        assert!(other_log.is_empty());
    }

    #[test]
    fn emit_never_panics_on_repeated_calls() {
        let dir = tempfile::tempdir().unwrap();
        let sink = LogSink::init(dir.path(), 1024 * 1024).unwrap();
        for i in 0..50 {
            sink.emit(LogRecord::new(Level::Info, "AGENT step", format!("iteration {i}")));
        }
        let log = std::fs::read_to_string(dir.path().join("log_AGENT_WORKFLOW.txt")).unwrap();
        assert_eq!(log.lines().count(), 50);
    }
}
