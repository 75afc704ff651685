// SPDX-License-Identifier: Apache-2.0
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// §3 `Message`: append-only within a [`crate::conversation::Conversation`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn tool(content: impl Into<String>) -> Self {
        Self::new(Role::Tool, content)
    }

    pub fn to_chat_message(&self) -> core_llm::ChatMessage {
        let role = match self.role {
            Role::User => core_llm::Role::User,
            Role::Assistant => core_llm::Role::Assistant,
            Role::System => core_llm::Role::System,
            Role::Tool => core_llm::Role::Tool,
        };
        core_llm::ChatMessage {
            role,
            content: self.content.clone(),
        }
    }
}
