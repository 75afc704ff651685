// SPDX-License-Identifier: Apache-2.0
use std::path::{Path, PathBuf};

use serde_yaml::Value;

use crate::error::ConfigError;
use crate::schema::Config;

/// Search paths tried in order, lowest to highest precedence.
///
/// A system-wide file, a user config directory, then a workspace-local
/// file; each present file is deep merged over the previous result,
/// with the later source winning on scalars.
fn config_search_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("/etc/aria/config.yaml"));
    paths.push(PathBuf::from("/etc/aria/config.yml"));

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".config/aria/config.yaml"));
        paths.push(home.join(".config/aria/config.yml"));
    }
    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("aria/config.yaml"));
        paths.push(config_dir.join("aria/config.yml"));
    }

    paths.push(PathBuf::from(".aria/config.yaml"));
    paths.push(PathBuf::from(".aria/config.yml"));
    paths.push(PathBuf::from(".aria.yaml"));
    paths.push(PathBuf::from(".aria.yml"));
    paths.push(PathBuf::from("aria.yaml"));
    paths.push(PathBuf::from("aria.yml"));

    paths
}

/// Recursive deep merge of two YAML mappings. `src` wins on scalars and on
/// keys not present in `dst`; nested mappings are merged key-by-key rather
/// than replaced wholesale.
fn merge_yaml(dst: &mut Value, src: Value) {
    match (dst, src) {
        (Value::Mapping(dst_map), Value::Mapping(src_map)) => {
            for (key, src_val) in src_map {
                match dst_map.get_mut(&key) {
                    Some(dst_val) => merge_yaml(dst_val, src_val),
                    None => {
                        dst_map.insert(key, src_val);
                    }
                }
            }
        }
        (dst_slot, src_val) => {
            *dst_slot = src_val;
        }
    }
}

fn read_yaml_file(path: &Path) -> Result<Value, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Environment variable overrides applied after file-based configuration,
/// per §6.4. Every variable is optional; absence leaves the prior value
/// untouched.
fn apply_env_overrides(config: &mut Config) {
    if let Ok(v) = std::env::var("OPENAI_API_KEY") {
        config.model.cloud.api_key = Some(v);
    }
    if let Ok(v) = std::env::var("OPENAI_TIMEOUT") {
        if let Ok(n) = v.parse() {
            config.model.cloud.timeout_secs = n;
        }
    }
    if let Ok(v) = std::env::var("OPENAI_CONNECT_TIMEOUT") {
        if let Ok(n) = v.parse() {
            config.model.cloud.connect_timeout_secs = n;
        }
    }
    if let Ok(v) = std::env::var("OLLAMA_HOST") {
        config.model.local.base_url = v;
    }
    if let Ok(v) = std::env::var("GPT_MODEL") {
        config.model.planner_model = v;
    }
    if let Ok(v) = std::env::var("CLASSIFIER_MODEL") {
        config.model.classifier_model = v;
    }
    if let Ok(v) = std::env::var("MAX_REQUESTS_PER_MINUTE") {
        if let Ok(n) = v.parse() {
            config.model.max_requests_per_minute = n;
        }
    }
    if let Ok(v) = std::env::var("MCP_CONFIG_PATH") {
        config.mcp.config_path = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("MCP_TIMEOUT") {
        if let Ok(n) = v.parse() {
            config.mcp.timeout_secs = n;
        }
    }
    if let Ok(v) = std::env::var("LOG_DIR") {
        config.logging.log_dir = PathBuf::from(v);
    }
    if let Ok(v) = std::env::var("LOG_LEVEL") {
        config.logging.log_level = v;
    }
}

/// Load configuration by layering, in increasing precedence: built-in
/// defaults, each existing file from [`config_search_paths`], an optional
/// explicit `--config` path, and finally environment variable overrides.
///
/// An explicit path that does not exist is an error; a missing file from
/// the built-in search list is silently skipped.
pub fn load(explicit: Option<&Path>) -> Result<Config, ConfigError> {
    let mut merged = Value::Mapping(Default::default());

    for path in config_search_paths() {
        if path.is_file() {
            let doc = read_yaml_file(&path)?;
            merge_yaml(&mut merged, doc);
        }
    }

    if let Some(path) = explicit {
        let doc = read_yaml_file(path)?;
        merge_yaml(&mut merged, doc);
    }

    let mut config: Config = if matches!(&merged, Value::Mapping(m) if m.is_empty()) {
        Config::default()
    } else {
        serde_yaml::from_value(merged).map_err(|source| ConfigError::Parse {
            path: explicit.map(Path::to_path_buf).unwrap_or_default(),
            source,
        })?
    };

    apply_env_overrides(&mut config);
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_scalar_src_wins() {
        let mut dst: Value = serde_yaml::from_str("a: 1\nb: 2\n").unwrap();
        let src: Value = serde_yaml::from_str("a: 9\n").unwrap();
        merge_yaml(&mut dst, src);
        assert_eq!(dst["a"].as_i64(), Some(9));
        assert_eq!(dst["b"].as_i64(), Some(2));
    }

    #[test]
    fn merge_preserves_keys_not_in_src() {
        let mut dst: Value = serde_yaml::from_str("model:\n  planner_model: foo\n").unwrap();
        let src: Value = serde_yaml::from_str("mcp:\n  timeout_secs: 5\n").unwrap();
        merge_yaml(&mut dst, src);
        assert_eq!(dst["model"]["planner_model"].as_str(), Some("foo"));
        assert_eq!(dst["mcp"]["timeout_secs"].as_i64(), Some(5));
    }

    #[test]
    fn merge_nested_tables() {
        let mut dst: Value =
            serde_yaml::from_str("model:\n  cloud:\n    base_url: https://a\n").unwrap();
        let src: Value =
            serde_yaml::from_str("model:\n  cloud:\n    api_key: secret\n").unwrap();
        merge_yaml(&mut dst, src);
        assert_eq!(dst["model"]["cloud"]["base_url"].as_str(), Some("https://a"));
        assert_eq!(dst["model"]["cloud"]["api_key"].as_str(), Some("secret"));
    }

    #[test]
    fn load_returns_error_when_explicit_path_missing() {
        let result = load(Some(Path::new("/nonexistent/path/aria.yaml")));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn load_with_no_extra_path_returns_defaults_when_no_files_present() {
        // This relies on there being no real config files at the well-known
        // search paths in the test environment; it exercises the
        // all-paths-missing branch.
        let config = load(None);
        assert!(config.is_ok());
    }

    #[test]
    fn load_explicit_file_overrides_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "model:\n  planner_model: custom-model\n").unwrap();
        let config = load(Some(file.path())).unwrap();
        assert_eq!(config.model.planner_model, "custom-model");
    }
}
