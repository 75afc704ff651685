// SPDX-License-Identifier: Apache-2.0
use serde::Deserialize;
use serde_json::{json, Value};

use core_llm::{CompletionOptions, LlmGateway};
use core_tools::{ToolCall, ToolRegistry};

use crate::conversation::ConversationStore;
use crate::message::Message;
use crate::planner::DefaultComplexityAnalyzer;
use crate::task::WorkflowState;
use crate::workflow::{WorkflowContext, WorkflowEngine};

/// §6.3: the typed contract the (external) slash-command subsystem's
/// output is expected to match.
#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub command: String,
    pub options: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct CommandNotFound {
    pub command: String,
}

#[derive(Debug, Clone)]
pub enum RouterInput {
    Slash(CommandRequest),
    Line(String),
}

/// §4.8: the turn's rendered output, whatever path produced it.
#[derive(Debug, Clone)]
pub struct Turn {
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Intent {
    Chat,
    Tool,
    Agent,
}

#[derive(Deserialize)]
struct IntentResponse {
    intent: String,
}

fn classify_intent(value: &Value) -> Intent {
    let parsed: Option<IntentResponse> = serde_json::from_value(value.clone()).ok();
    match parsed.map(|r| r.intent) {
        Some(intent) if intent == "tool" => Intent::Tool,
        Some(intent) if intent == "agent" => Intent::Agent,
        _ => Intent::Chat,
    }
}

pub struct RequestRouter<'a> {
    gateway: &'a LlmGateway,
    tools: &'a ToolRegistry,
    conversation: &'a ConversationStore,
    classifier_model: String,
    planner_model: String,
    max_depth: u32,
    max_attempts: u32,
}

impl<'a> RequestRouter<'a> {
    pub fn new(
        gateway: &'a LlmGateway,
        tools: &'a ToolRegistry,
        conversation: &'a ConversationStore,
        classifier_model: impl Into<String>,
        planner_model: impl Into<String>,
        max_depth: u32,
        max_attempts: u32,
    ) -> Self {
        Self {
            gateway,
            tools,
            conversation,
            classifier_model: classifier_model.into(),
            planner_model: planner_model.into(),
            max_depth,
            max_attempts,
        }
    }

    pub async fn route(&self, input: RouterInput) -> Turn {
        match input {
            RouterInput::Slash(request) => self.route_slash(request),
            RouterInput::Line(line) => self.route_line(line).await,
        }
    }

    fn route_slash(&self, request: CommandRequest) -> Turn {
        match request.command.as_str() {
            "help" | "clear" | "exit" | "chat" | "tool" | "agent" => Turn {
                text: format!("ok: {}", request.command),
            },
            other => {
                let not_found = CommandNotFound {
                    command: other.to_string(),
                };
                Turn {
                    text: format!("unknown command: {}", not_found.command),
                }
            }
        }
    }

    async fn route_line(&self, line: String) -> Turn {
        self.conversation.append(Message::user(&line));

        let schema_prompt = format!(
            "Classify this user message as one of chat, tool, agent. Respond with JSON {{\"intent\": \"...\"}}.\nMessage: {line}"
        );
        let opts = CompletionOptions::new(&self.classifier_model);
        let intent = match self.gateway.complete_json(schema_prompt, &opts).await {
            Ok(value) => classify_intent(&value),
            Err(_) => Intent::Chat,
        };

        match intent {
            Intent::Chat => self.run_chat(&line).await,
            Intent::Tool => self.run_tool_selector(&line).await,
            Intent::Agent => self.run_agent(&line).await,
        }
    }

    async fn run_chat(&self, line: &str) -> Turn {
        use tokio_stream::StreamExt;

        let opts = CompletionOptions::new(&self.classifier_model);
        let history = self.conversation.snapshot();
        let messages: Vec<core_llm::ChatMessage> = history.iter().map(Message::to_chat_message).collect();
        let text = match self.gateway.complete_stream(messages, &opts).await {
            Ok(mut stream) => {
                let mut text = String::new();
                let mut stream_err = None;
                while let Some(chunk) = stream.next().await {
                    match chunk {
                        Ok(chunk) => text.push_str(&chunk.delta),
                        Err(err) => {
                            stream_err = Some(err);
                            break;
                        }
                    }
                }
                match stream_err {
                    Some(err) => format!("chat request failed: {err}"),
                    None => text,
                }
            }
            Err(err) => format!("chat request failed: {err}"),
        };
        self.conversation.append(Message::assistant(&text));
        let _ = line;
        Turn { text }
    }

    async fn run_tool_selector(&self, line: &str) -> Turn {
        let catalog: Vec<String> = self.tools.list().into_iter().map(|d| d.name.clone()).collect();
        let prompt = format!(
            "Pick exactly one tool and its arguments for: {line}\nAvailable tools: {}\nRespond with JSON {{\"tool_name\": \"...\", \"arguments\": {{...}}}}.",
            catalog.join(", ")
        );
        let opts = CompletionOptions::new(&self.planner_model);
        let selection = match self.gateway.complete_json(prompt, &opts).await {
            Ok(value) => value,
            Err(err) => {
                let text = format!("tool selection failed: {err}");
                self.conversation.append(Message::tool(&text));
                return Turn { text };
            }
        };

        let tool_name = selection
            .get("tool_name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let arguments = selection.get("arguments").cloned().unwrap_or_else(|| json!({}));

        let call = ToolCall {
            id: uuid::Uuid::new_v4().to_string(),
            name: tool_name,
            args: arguments,
        };

        let text = match self.tools.invoke(call).await {
            Ok(output) => output.content,
            Err(err) => format!("tool invocation failed: {err}"),
        };
        self.conversation.append(Message::tool(&text));
        Turn { text }
    }

    async fn run_agent(&self, line: &str) -> Turn {
        let mut state = WorkflowState::new(line, "assistant");
        let analyzer = DefaultComplexityAnalyzer::default();
        let not_cancelled = || false;
        let ctx = WorkflowContext {
            gateway: self.gateway,
            tools: self.tools,
            complexity_analyzer: &analyzer,
            planner_model: self.planner_model.clone(),
            classifier_model: self.classifier_model.clone(),
            max_depth: self.max_depth,
            max_attempts: self.max_attempts,
            cancel: &not_cancelled,
        };

        let text = match WorkflowEngine::drive(&mut state, &ctx).await {
            Ok(()) => state.final_response.unwrap_or_default(),
            Err(err) => format!("agent workflow failed: {err}"),
        };
        self.conversation.append(Message::assistant(&text));
        Turn { text }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_llm::{ChunkedMockProvider, MockProvider};
    use core_tools::ToolRegistry;
    use std::time::Duration;

    fn gateway_with(cloud_response: &str, local_response: &str) -> LlmGateway {
        LlmGateway::from_providers(
            Box::new(MockProvider::new("mock", cloud_response)),
            Box::new(MockProvider::new("mock", local_response)),
            30,
        )
    }

    /// The cloud provider's `complete()` (used for intent classification)
    /// returns a concatenation of `chunks` that won't parse as the intent
    /// JSON, so `classify_intent` falls back to its `Chat` default; its
    /// `complete_stream()` (used by `run_chat`) yields `chunks` in order.
    fn gateway_with_chat_chunks(chunks: Vec<String>) -> LlmGateway {
        LlmGateway::from_providers(
            Box::new(ChunkedMockProvider::new("mock", chunks)),
            Box::new(MockProvider::new("mock", "{}")),
            30,
        )
    }

    #[tokio::test]
    async fn slash_help_is_ok() {
        let gateway = gateway_with("{}", "{}");
        let tools = ToolRegistry::new(Duration::from_secs(5));
        let conversation = ConversationStore::new();
        let router = RequestRouter::new(&gateway, &tools, &conversation, "gpt", "gpt", 4, 3);

        let turn = router
            .route(RouterInput::Slash(CommandRequest {
                command: "help".to_string(),
                options: vec![],
            }))
            .await;
        assert_eq!(turn.text, "ok: help");
    }

    #[tokio::test]
    async fn slash_unknown_is_reported() {
        let gateway = gateway_with("{}", "{}");
        let tools = ToolRegistry::new(Duration::from_secs(5));
        let conversation = ConversationStore::new();
        let router = RequestRouter::new(&gateway, &tools, &conversation, "gpt", "gpt", 4, 3);

        let turn = router
            .route(RouterInput::Slash(CommandRequest {
                command: "frobnicate".to_string(),
                options: vec![],
            }))
            .await;
        assert_eq!(turn.text, "unknown command: frobnicate");
    }

    #[tokio::test]
    async fn plain_line_with_chat_intent_streams_and_appends() {
        let gateway = gateway_with_chat_chunks(vec!["hel".to_string(), "lo ".to_string(), "world".to_string()]);
        let tools = ToolRegistry::new(Duration::from_secs(5));
        let conversation = ConversationStore::new();
        let router = RequestRouter::new(&gateway, &tools, &conversation, "gpt", "gpt", 4, 3);

        let turn = router.route(RouterInput::Line("hi".to_string())).await;
        assert_eq!(turn.text, "hello world");
        assert_eq!(conversation.snapshot().len(), 2);
        assert_eq!(conversation.snapshot()[1].content, "hello world");
    }
}
