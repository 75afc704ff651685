// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_config::EndpointConfig;

use crate::error::LlmError;
use crate::provider::ModelProvider;
use crate::types::{ChatMessage, CompletionOptions, Role};

/// Local, non-streaming Ollama-compatible `/api/chat` provider.
pub struct OllamaProvider {
    client: reqwest::Client,
    base_url: String,
}

impl OllamaProvider {
    pub fn new(config: &EndpointConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| LlmError::Fatal(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
        })
    }
}

fn role_str(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::System => "system",
        Role::Tool => "tool",
    }
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct OllamaResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: String,
}

#[async_trait]
impl ModelProvider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = OllamaRequest {
            model: &opts.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: role_str(m.role),
                    content: &m.content,
                })
                .collect(),
            stream: false,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() || e.is_connect() {
                    LlmError::Transient(e.to_string())
                } else {
                    LlmError::Fatal(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let retry_after_present = response.headers().contains_key("retry-after");
            let body_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(
                status.as_u16(),
                retry_after_present,
                body_text,
            ));
        }

        let parsed: OllamaResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Fatal(e.to_string()))?;
        Ok(parsed.message.content)
    }
}
