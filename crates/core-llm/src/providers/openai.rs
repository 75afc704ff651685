// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use core_config::EndpointConfig;

use crate::error::LlmError;
use crate::provider::ModelProvider;
use crate::types::{ChatMessage, CompletionOptions, Role};

/// OpenAI-compatible chat completions provider; also the base shape for
/// any cloud endpoint speaking the same wire format.
pub struct OpenAiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl OpenAiProvider {
    pub fn new(config: &EndpointConfig) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| LlmError::Fatal(e.to_string()))?;
        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
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
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

#[async_trait]
impl ModelProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    fn endpoint(&self) -> &str {
        &self.base_url
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &opts.model,
            messages: messages
                .iter()
                .map(|m| WireMessage {
                    role: role_str(m.role),
                    content: &m.content,
                })
                .collect(),
            temperature: opts.temperature,
            max_tokens: opts.max_tokens,
        };

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
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

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Fatal(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::Fatal("empty choices array".to_string()))
    }
}
