// SPDX-License-Identifier: Apache-2.0
use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The six log categories named in §4.1/§6.5. Order here matches file
/// name order under `LOG_DIR`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    McpServer,
    ApiCall,
    ToolExecution,
    AgentWorkflow,
    ErrorTraceback,
    Other,
}

impl Category {
    /// File stem under `LOG_DIR`, e.g. `log_MCP_SERVER.txt`.
    pub fn file_name(self) -> &'static str {
        match self {
            Category::McpServer => "log_MCP_SERVER.txt",
            Category::ApiCall => "log_API_CALL.txt",
            Category::ToolExecution => "log_TOOL_EXECUTION.txt",
            Category::AgentWorkflow => "log_AGENT_WORKFLOW.txt",
            Category::ErrorTraceback => "log_ERROR_TRACEBACK.txt",
            Category::Other => "log_OTHER.txt",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Category::McpServer => "MCP_SERVER",
            Category::ApiCall => "API_CALL",
            Category::ToolExecution => "TOOL_EXECUTION",
            Category::AgentWorkflow => "AGENT_WORKFLOW",
            Category::ErrorTraceback => "ERROR_TRACEBACK",
            Category::Other => "OTHER",
        }
    }

    /// Maps a record's `heading` to a category by scanning an ordered
    /// keyword table; first match wins (§4.1).
    pub fn classify(heading: &str) -> Category {
        let upper = heading.to_uppercase();
        const TABLE: &[(&[&str], Category)] = &[
            (&["MCP"], Category::McpServer),
            (&["OPENAI", "OLLAMA", "API"], Category::ApiCall),
            (&["TOOL"], Category::ToolExecution),
            (&["AGENT"], Category::AgentWorkflow),
            (&["ERROR"], Category::ErrorTraceback),
        ];
        for (keywords, category) in TABLE {
            if keywords.iter().any(|kw| upper.contains(kw)) {
                return *category;
            }
        }
        Category::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(self) -> &'static str {
        match self {
            Level::Trace => "TRACE",
            Level::Debug => "DEBUG",
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

impl From<tracing::Level> for Level {
    fn from(level: tracing::Level) -> Self {
        match level {
            tracing::Level::TRACE => Level::Trace,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warn,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

/// A single structured log entry (§3 data model).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub level: Level,
    pub category: Category,
    pub heading: String,
    pub body: String,
    pub timestamp: DateTime<Utc>,
    pub metadata: BTreeMap<String, String>,
}

impl LogRecord {
    pub fn new(level: Level, heading: impl Into<String>, body: impl Into<String>) -> Self {
        let heading = heading.into();
        Self {
            level,
            category: Category::classify(&heading),
            heading,
            body: body.into(),
            timestamp: Utc::now(),
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Renders the exact line format from §6.5:
    /// `[<ts>]\t<LEVEL> - <CATEGORY>: \t<heading> | <body> \tMetadata: [ k=v, k=v ]`
    pub fn format_line(&self) -> String {
        let metadata = self
            .metadata
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join(", ");
        format!(
            "[{}]\t{} - {}: \t{} | {} \tMetadata: [ {} ]",
            self.timestamp.to_rfc3339(),
            self.level.as_str(),
            self.category.as_str(),
            self.heading,
            self.body,
            metadata
        )
    }
}
