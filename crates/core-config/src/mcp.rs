// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One entry of the top-level `inputs` array (§6.1): a value prompted for
/// once at startup and then available for `%NAME%` substitution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpInputSpec {
    pub id: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "type", default = "default_input_type")]
    pub input_type: String,
    #[serde(default)]
    pub password: bool,
}

fn default_input_type() -> String {
    "promptString".into()
}

/// One entry of the `servers` map (§6.1). Only the `stdio` transport is
/// specified; `server_type` is kept so an unrecognized future value can be
/// rejected with a clear `ServerStartupError` rather than silently ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct McpServerSpec {
    #[serde(rename = "type", default = "default_server_type")]
    pub server_type: String,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

fn default_server_type() -> String {
    "stdio".into()
}

/// The `.mcp.json` document itself, deserialized verbatim before
/// placeholder resolution.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct McpConfigDocument {
    #[serde(default)]
    pub inputs: Vec<McpInputSpec>,
    #[serde(default)]
    pub servers: HashMap<String, McpServerSpec>,
}

/// A fully resolved server configuration, every `%PLACEHOLDER%` in `env`
/// replaced with a concrete value. This is the type `core-mcp` consumes;
/// it never sees an unresolved placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MCPServerConfig {
    pub id: String,
    pub command: String,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub cwd: Option<PathBuf>,
}

/// Supplies the value for one declared `input` the first time it is
/// needed. Production wiring prompts the user once and caches the answer;
/// tests supply a fixed map.
pub trait PromptResolver {
    fn resolve_input(&mut self, spec: &McpInputSpec) -> Option<String>;
}

/// A resolver backed by a fixed map, for tests and non-interactive runs.
pub struct StaticResolver(pub HashMap<String, String>);

impl PromptResolver for StaticResolver {
    fn resolve_input(&mut self, spec: &McpInputSpec) -> Option<String> {
        self.0.get(&spec.id).cloned()
    }
}

/// Parse a `.mcp.json` document from `path` and resolve it into a list of
/// [`MCPServerConfig`], substituting every `%NAME%` placeholder in `env`
/// values against `inputs` (via `resolver`) first, then process env.
///
/// An unresolved placeholder is a distinct, per-server fatal error (§6.1):
/// it does not abort parsing of the other servers at this layer, but the
/// caller receives a `ConfigError::UnresolvedPlaceholder` identifying
/// which server and name failed so it can be reported and that server
/// skipped, mirroring `ServerStartupError`'s "per-server, rest proceed"
/// policy described in §7.
pub fn load_mcp_config(
    path: &Path,
    resolver: &mut dyn PromptResolver,
) -> Result<Vec<MCPServerConfig>, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::McpRead {
        path: path.to_path_buf(),
        source,
    })?;
    let doc: McpConfigDocument =
        serde_json::from_str(&text).map_err(|source| ConfigError::McpParse {
            path: path.to_path_buf(),
            source,
        })?;

    let input_by_id: HashMap<&str, &McpInputSpec> =
        doc.inputs.iter().map(|i| (i.id.as_str(), i)).collect();

    let mut resolved = Vec::with_capacity(doc.servers.len());
    for (server_id, spec) in doc.servers {
        let mut env = HashMap::with_capacity(spec.env.len());
        for (key, raw_value) in spec.env {
            let value = resolve_placeholder(&server_id, &raw_value, &input_by_id, resolver)?;
            env.insert(key, value);
        }
        resolved.push(MCPServerConfig {
            id: server_id,
            command: spec.command,
            args: spec.args,
            env,
            cwd: spec.cwd,
        });
    }
    resolved.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(resolved)
}

fn resolve_placeholder(
    server_id: &str,
    raw: &str,
    inputs: &HashMap<&str, &McpInputSpec>,
    resolver: &mut dyn PromptResolver,
) -> Result<String, ConfigError> {
    if !(raw.starts_with('%') && raw.ends_with('%') && raw.len() > 2) {
        return Ok(raw.to_string());
    }
    let name = &raw[1..raw.len() - 1];

    if let Some(spec) = inputs.get(name) {
        if let Some(value) = resolver.resolve_input(spec) {
            return Ok(value);
        }
    }
    if let Ok(value) = std::env::var(name) {
        return Ok(value);
    }
    Err(ConfigError::UnresolvedPlaceholder {
        server_id: server_id.to_string(),
        name: name.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver_with(pairs: &[(&str, &str)]) -> StaticResolver {
        StaticResolver(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn parses_minimal_document() {
        let json = r#"{
            "inputs": [],
            "servers": {
                "fs": { "type": "stdio", "command": "mcp-fs", "args": ["--root", "."] }
            }
        }"#;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), json).unwrap();

        let mut resolver = resolver_with(&[]);
        let servers = load_mcp_config(file.path(), &mut resolver).unwrap();
        assert_eq!(servers.len(), 1);
        assert_eq!(servers[0].id, "fs");
        assert_eq!(servers[0].command, "mcp-fs");
        assert_eq!(servers[0].args, vec!["--root", "."]);
    }

    #[test]
    fn resolves_placeholder_against_input() {
        let json = r#"{
            "inputs": [ { "id": "api_key", "description": "key", "type": "promptString", "password": true } ],
            "servers": {
                "search": { "type": "stdio", "command": "mcp-search", "env": { "API_KEY": "%api_key%" } }
            }
        }"#;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), json).unwrap();

        let mut resolver = resolver_with(&[("api_key", "sekrit")]);
        let servers = load_mcp_config(file.path(), &mut resolver).unwrap();
        assert_eq!(servers[0].env.get("API_KEY"), Some(&"sekrit".to_string()));
    }

    #[test]
    fn resolves_placeholder_against_process_env() {
        std::env::set_var("ARIA_TEST_PLACEHOLDER_TOKEN", "from-env");
        let json = r#"{
            "inputs": [],
            "servers": {
                "search": { "type": "stdio", "command": "mcp-search", "env": { "TOKEN": "%ARIA_TEST_PLACEHOLDER_TOKEN%" } }
            }
        }"#;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), json).unwrap();

        let mut resolver = resolver_with(&[]);
        let servers = load_mcp_config(file.path(), &mut resolver).unwrap();
        assert_eq!(servers[0].env.get("TOKEN"), Some(&"from-env".to_string()));
        std::env::remove_var("ARIA_TEST_PLACEHOLDER_TOKEN");
    }

    #[test]
    fn unresolved_placeholder_is_distinct_error() {
        let json = r#"{
            "inputs": [],
            "servers": {
                "search": { "type": "stdio", "command": "mcp-search", "env": { "TOKEN": "%NEVER_DEFINED_XYZ%" } }
            }
        }"#;
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), json).unwrap();

        let mut resolver = resolver_with(&[]);
        let err = load_mcp_config(file.path(), &mut resolver).unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedPlaceholder { .. }));
    }

    #[test]
    fn missing_file_is_read_error() {
        let mut resolver = resolver_with(&[]);
        let err = load_mcp_config(Path::new("/nonexistent/.mcp.json"), &mut resolver).unwrap_err();
        assert!(matches!(err, ConfigError::McpRead { .. }));
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{ not json").unwrap();
        let mut resolver = resolver_with(&[]);
        let err = load_mcp_config(file.path(), &mut resolver).unwrap_err();
        assert!(matches!(err, ConfigError::McpParse { .. }));
    }
}
