// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{error, info};

use crate::descriptor::{Origin, ToolDescriptor};
use crate::error::ToolError;
use crate::mcp_caller::McpCaller;
use crate::schema::validate;
use crate::tool::{Tool, ToolCall, ToolOutput};

const MAX_RESULT_BYTES: usize = 64 * 1024;
const TRUNCATION_MARKER: &str = "\n...[output truncated]";

/// Read-mostly map of registered tools (§5 "Tool registry: read-mostly
/// map; frozen after startup"). `register` panics-free-returns an error
/// once [`ToolRegistry::freeze`] has been called, matching "`register`
/// is only legal before the router is ready".
pub struct ToolRegistry {
    descriptors: HashMap<String, ToolDescriptor>,
    handlers: HashMap<String, Arc<dyn Tool>>,
    mcp_caller: Option<Arc<dyn McpCaller>>,
    default_timeout: Duration,
    per_tool_timeout: HashMap<String, Duration>,
    frozen: AtomicBool,
}

impl ToolRegistry {
    pub fn new(default_timeout: Duration) -> Self {
        Self {
            descriptors: HashMap::new(),
            handlers: HashMap::new(),
            mcp_caller: None,
            default_timeout,
            per_tool_timeout: HashMap::new(),
            frozen: AtomicBool::new(false),
        }
    }

    pub fn set_mcp_caller(&mut self, caller: Arc<dyn McpCaller>) {
        self.mcp_caller = Some(caller);
    }

    /// Registers a builtin tool. Duplicate registration by name is a
    /// fatal startup error per §3 ("Registered exactly once per name").
    pub fn register(&mut self, tool: Arc<dyn Tool>) -> Result<(), ToolError> {
        if self.frozen.load(Ordering::Acquire) {
            return Err(ToolError::ToolTransportError {
                tool: tool.name().to_string(),
                message: "registry is frozen; register must run before startup completes".into(),
            });
        }
        let name = tool.name().to_string();
        if self.descriptors.contains_key(&name) {
            panic!("duplicate tool registration for `{name}`: fatal startup error");
        }
        self.descriptors.insert(
            name.clone(),
            ToolDescriptor {
                name: name.clone(),
                description: tool.description().to_string(),
                arg_schema: tool.arg_schema(),
                origin: Origin::Builtin,
            },
        );
        self.handlers.insert(name, tool);
        Ok(())
    }

    /// Registers tools discovered from an MCP server (§4.2 handshake).
    /// A name collision with an already-registered tool is namespaced
    /// to `<server_id>:<name>`, per §4.2.
    pub fn register_mcp_tool(&mut self, server_id: &str, mut descriptor: ToolDescriptor) {
        if self.frozen.load(Ordering::Acquire) {
            panic!("register_mcp_tool called after registry was frozen");
        }
        if self.descriptors.contains_key(&descriptor.name) {
            descriptor.name = format!("{server_id}:{}", descriptor.name);
        }
        descriptor.origin = Origin::Mcp(server_id.to_string());
        self.descriptors.insert(descriptor.name.clone(), descriptor);
    }

    pub fn with_tool_timeout(&mut self, tool_name: &str, timeout: Duration) {
        self.per_tool_timeout.insert(tool_name.to_string(), timeout);
    }

    pub fn freeze(&self) {
        self.frozen.store(true, Ordering::Release);
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.descriptors.get(name)
    }

    pub fn list(&self) -> Vec<&ToolDescriptor> {
        let mut descriptors: Vec<_> = self.descriptors.values().collect();
        descriptors.sort_by(|a, b| a.name.cmp(&b.name));
        descriptors
    }

    fn timeout_for(&self, name: &str) -> Duration {
        self.per_tool_timeout
            .get(name)
            .copied()
            .unwrap_or(self.default_timeout)
    }

    /// Implements the five-step invocation contract from §4.4, in
    /// order: resolve, validate, dispatch, normalize, log.
    pub async fn invoke(&self, call: ToolCall) -> Result<ToolOutput, ToolError> {
        let started = Instant::now();

        // 1. Resolve.
        let descriptor = match self.descriptors.get(&call.name) {
            Some(d) => d,
            None => {
                return Err(ToolError::ToolNotFound {
                    name: call.name.clone(),
                })
            }
        };

        // 2. Validate.
        let valid_args = validate(&descriptor.arg_schema, &call.args)
            .into_result()
            .map_err(|source| ToolError::ToolArgError {
                tool: call.name.clone(),
                source,
            })?;

        // 3. Dispatch, with a per-call timeout.
        let timeout = self.timeout_for(&call.name);
        let dispatch_result = tokio::time::timeout(timeout, async {
            match &descriptor.origin {
                Origin::Builtin => {
                    let handler = self.handlers.get(&call.name).expect("builtin descriptor without handler");
                    handler
                        .execute(valid_args)
                        .await
                        .map_err(|source| ToolError::ToolHandlerError {
                            tool: call.name.clone(),
                            source,
                        })
                }
                Origin::Mcp(server_id) => {
                    let caller = self
                        .mcp_caller
                        .as_ref()
                        .expect("MCP-origin tool registered without an McpCaller wired in");
                    let result = caller
                        .call(server_id, &call.name, call.args.clone())
                        .await
                        .map_err(|e| ToolError::ToolTransportError {
                            tool: call.name.clone(),
                            message: e.to_string(),
                        })?;
                    Ok(normalize_value(&result))
                }
            }
        })
        .await;

        let outcome = match dispatch_result {
            Ok(Ok(text)) => Ok(text),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(ToolError::ToolTimeout {
                tool: call.name.clone(),
                timeout_secs: timeout.as_secs(),
            }),
        };

        // 4. Normalize + 5. Log.
        let duration = started.elapsed();
        match outcome {
            Ok(text) => {
                let normalized = truncate_if_needed(text);
                info!(
                    target: "TOOL",
                    tool = %call.name,
                    duration_ms = duration.as_millis() as u64,
                    status = "ok",
                    "tool execution completed"
                );
                Ok(ToolOutput::ok(call.id, normalized))
            }
            Err(err) => {
                error!(
                    target: "TOOL",
                    tool = %call.name,
                    duration_ms = duration.as_millis() as u64,
                    status = "error",
                    error = %err,
                    "tool execution failed"
                );
                Err(err)
            }
        }
    }
}

fn normalize_value(value: &Value) -> String {
    if let Some(text) = value.as_str() {
        text.to_string()
    } else {
        serde_json::to_string(value).unwrap_or_default()
    }
}

fn truncate_if_needed(text: String) -> String {
    if text.len() <= MAX_RESULT_BYTES {
        return text;
    }
    let mut cut = MAX_RESULT_BYTES;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    let mut truncated = text[..cut].to_string();
    truncated.push_str(TRUNCATION_MARKER);
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolHandlerError;
    use crate::schema::{ArgSchema, Field, FieldKind, ValidArgs};
    use async_trait::async_trait;
    use serde_json::json;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes the `text` argument"
        }
        fn arg_schema(&self) -> ArgSchema {
            ArgSchema::new(vec![Field::required("text", FieldKind::String, "text to echo")])
        }
        async fn execute(&self, args: ValidArgs) -> Result<String, ToolHandlerError> {
            Ok(args.str("text").unwrap_or_default().to_string())
        }
    }

    struct SlowTool;

    #[async_trait]
    impl Tool for SlowTool {
        fn name(&self) -> &str {
            "slow"
        }
        fn description(&self) -> &str {
            "never finishes"
        }
        fn arg_schema(&self) -> ArgSchema {
            ArgSchema::empty()
        }
        async fn execute(&self, _args: ValidArgs) -> Result<String, ToolHandlerError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("unreachable".into())
        }
    }

    fn registry_with(tools: Vec<Arc<dyn Tool>>) -> ToolRegistry {
        let mut registry = ToolRegistry::new(Duration::from_secs(30));
        for tool in tools {
            registry.register(tool).unwrap();
        }
        registry
    }

    #[tokio::test]
    async fn invoke_resolves_validates_dispatches_and_normalizes() {
        let registry = registry_with(vec![Arc::new(EchoTool)]);
        let output = registry
            .invoke(ToolCall {
                id: "1".into(),
                name: "echo".into(),
                args: json!({ "text": "hello" }),
            })
            .await
            .unwrap();
        assert_eq!(output.content, "hello");
        assert!(!output.is_error);
    }

    #[tokio::test]
    async fn invoke_unknown_tool_is_not_found() {
        let registry = registry_with(vec![]);
        let err = registry
            .invoke(ToolCall {
                id: "1".into(),
                name: "missing".into(),
                args: json!({}),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ToolNotFound { .. }));
    }

    #[tokio::test]
    async fn invoke_missing_required_arg_is_arg_error() {
        let registry = registry_with(vec![Arc::new(EchoTool)]);
        let err = registry
            .invoke(ToolCall {
                id: "1".into(),
                name: "echo".into(),
                args: json!({}),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ToolArgError { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn invoke_times_out_slow_tool() {
        let mut registry = ToolRegistry::new(Duration::from_millis(10));
        registry.register(Arc::new(SlowTool)).unwrap();

        // Paused time auto-advances to the nearest pending timer (the
        // 10ms dispatch timeout), so this resolves without real delay.
        let result = registry
            .invoke(ToolCall {
                id: "1".into(),
                name: "slow".into(),
                args: json!({}),
            })
            .await;
        assert!(matches!(result, Err(ToolError::ToolTimeout { .. })));
    }

    #[tokio::test]
    async fn truncates_oversized_output() {
        struct HugeTool;
        #[async_trait]
        impl Tool for HugeTool {
            fn name(&self) -> &str {
                "huge"
            }
            fn description(&self) -> &str {
                "returns more than 64KiB"
            }
            fn arg_schema(&self) -> ArgSchema {
                ArgSchema::empty()
            }
            async fn execute(&self, _args: ValidArgs) -> Result<String, ToolHandlerError> {
                Ok("x".repeat(100_000))
            }
        }

        let registry = registry_with(vec![Arc::new(HugeTool)]);
        let output = registry
            .invoke(ToolCall {
                id: "1".into(),
                name: "huge".into(),
                args: json!({}),
            })
            .await
            .unwrap();
        assert!(output.content.len() <= MAX_RESULT_BYTES + TRUNCATION_MARKER.len());
        assert!(output.content.ends_with(TRUNCATION_MARKER));
    }

    #[test]
    fn list_is_sorted_by_name() {
        let registry = registry_with(vec![Arc::new(SlowTool), Arc::new(EchoTool)]);
        let names: Vec<_> = registry.list().iter().map(|d| d.name.clone()).collect();
        assert_eq!(names, vec!["echo".to_string(), "slow".to_string()]);
    }

    #[test]
    #[should_panic(expected = "duplicate tool registration")]
    fn duplicate_registration_panics() {
        let mut registry = ToolRegistry::new(Duration::from_secs(30));
        registry.register(Arc::new(EchoTool)).unwrap();
        let _ = registry.register(Arc::new(EchoTool));
    }
}
