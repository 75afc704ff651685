// SPDX-License-Identifier: Apache-2.0
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::LlmError;
use crate::provider::{ModelProvider, ResponseStream};
use crate::types::{ChatMessage, CompletionOptions, ResponseChunk};

/// Always returns a fixed string. Used where a test only needs "some
/// response came back" rather than specific content.
pub struct MockProvider {
    endpoint: String,
    response: String,
}

impl MockProvider {
    pub fn new(endpoint: impl Into<String>, response: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            response: response.into(),
        }
    }
}

#[async_trait]
impl ModelProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        Ok(self.response.clone())
    }
}

/// Replays a fixed, ordered script of results, one per call. Used to
/// exercise retry/backoff and circuit-breaker paths deterministically:
/// a script of `[Err(transient), Err(transient), Ok("done")]` drives a
/// gateway test through two retries without any network access.
pub struct ScriptedMockProvider {
    endpoint: String,
    script: Mutex<std::collections::VecDeque<Result<String, LlmError>>>,
}

impl ScriptedMockProvider {
    pub fn new(endpoint: impl Into<String>, script: Vec<Result<String, LlmError>>) -> Self {
        Self {
            endpoint: endpoint.into(),
            script: Mutex::new(script.into()),
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptedMockProvider {
    fn name(&self) -> &str {
        "scripted-mock"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let mut script = self.script.lock().unwrap();
        script
            .pop_front()
            .unwrap_or_else(|| Err(LlmError::Fatal("script exhausted".to_string())))
    }
}

/// Yields a fixed sequence of chunks from `complete_stream` instead of
/// falling back to the trait's default one-chunk wrapping. Used to
/// exercise genuine chunked delivery rather than a single synthetic
/// chunk around a full response.
pub struct ChunkedMockProvider {
    endpoint: String,
    chunks: Vec<String>,
}

impl ChunkedMockProvider {
    pub fn new(endpoint: impl Into<String>, chunks: Vec<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            chunks,
        }
    }
}

#[async_trait]
impl ModelProvider for ChunkedMockProvider {
    fn name(&self) -> &str {
        "chunked-mock"
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        Ok(self.chunks.concat())
    }

    async fn complete_stream(
        &self,
        _messages: &[ChatMessage],
        _opts: &CompletionOptions,
    ) -> Result<ResponseStream, LlmError> {
        let last = self.chunks.len().saturating_sub(1);
        let chunks: Vec<Result<ResponseChunk, LlmError>> = self
            .chunks
            .iter()
            .cloned()
            .enumerate()
            .map(|(i, delta)| Ok(ResponseChunk { delta, done: i == last }))
            .collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }
}
