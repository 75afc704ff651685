// SPDX-License-Identifier: Apache-2.0
use async_trait::async_trait;
use tokio_stream::Stream;

use crate::error::LlmError;
use crate::types::{ChatMessage, CompletionOptions, ResponseChunk};

pub type ResponseStream = std::pin::Pin<Box<dyn Stream<Item = Result<ResponseChunk, LlmError>> + Send>>;

/// One HTTP-reachable model backend. The gateway wraps exactly one of
/// these per [`crate::types::EndpointKind`] and adds rate limiting,
/// retries, and circuit breaking on top; a provider itself is a thin,
/// stateless wire-format adapter.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    /// The base URL this provider talks to; used as the circuit
    /// breaker / rate budget key.
    fn endpoint(&self) -> &str;

    async fn complete(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOptions,
    ) -> Result<String, LlmError>;

    /// Default implementation wraps a single non-streamed `complete`
    /// call as a one-chunk stream; providers that support real
    /// token-by-token streaming override this.
    async fn complete_stream(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOptions,
    ) -> Result<ResponseStream, LlmError> {
        let text = self.complete(messages, opts).await?;
        let chunk = ResponseChunk {
            delta: text,
            done: true,
        };
        Ok(Box::pin(tokio_stream::once(Ok(chunk))))
    }
}
