// SPDX-License-Identifier: Apache-2.0
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// A single message as seen by the model provider wire format. Distinct
/// from `core-workflow`'s conversation `Message` (which additionally
/// tracks `created_at`); this type carries only what a provider's chat
/// endpoint needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// Either a bare prompt or a full message history; both call shapes
/// named in §4.3's contract collapse to this before reaching a provider.
#[derive(Debug, Clone)]
pub enum Prompt {
    Text(String),
    Messages(Vec<ChatMessage>),
}

impl Prompt {
    pub fn into_messages(self) -> Vec<ChatMessage> {
        match self {
            Prompt::Text(text) => vec![ChatMessage::user(text)],
            Prompt::Messages(messages) => messages,
        }
    }
}

impl From<&str> for Prompt {
    fn from(value: &str) -> Self {
        Prompt::Text(value.to_string())
    }
}

impl From<String> for Prompt {
    fn from(value: String) -> Self {
        Prompt::Text(value)
    }
}

impl From<Vec<ChatMessage>> for Prompt {
    fn from(value: Vec<ChatMessage>) -> Self {
        Prompt::Messages(value)
    }
}

/// Per-call options. `model` is the sole selector between the local and
/// cloud endpoints (§4.3 "Selection is a pure function of `model`").
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Returned by the gateway instead of a `CircuitOpen` error when the
    /// endpoint's circuit is open, per §4.3.
    pub fallback: Option<String>,
}

impl CompletionOptions {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            temperature: None,
            max_tokens: None,
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, fallback: impl Into<String>) -> Self {
        self.fallback = Some(fallback.into());
        self
    }
}

/// One chunk of a streamed completion.
#[derive(Debug, Clone)]
pub struct ResponseChunk {
    pub delta: String,
    pub done: bool,
}

/// Which physical endpoint a model name resolves to (§4.3 "Selection").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    Local,
    Cloud,
}
