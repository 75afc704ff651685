// SPDX-License-Identifier: Apache-2.0
//! LLM Gateway (C3): provider abstraction, per-endpoint rate limiting
//! and circuit breaking, retry policy, and JSON extraction.

mod circuit_breaker;
mod error;
mod gateway;
mod json_extract;
mod provider;
mod providers;
mod rate_budget;
mod types;

pub use circuit_breaker::{CircuitBreaker, CircuitState};
pub use error::LlmError;
pub use gateway::LlmGateway;
pub use json_extract::extract_json;
pub use provider::{ModelProvider, ResponseStream};
pub use providers::{ChunkedMockProvider, MockProvider, OllamaProvider, OpenAiProvider, ScriptedMockProvider};
pub use rate_budget::RateBudget;
pub use types::{ChatMessage, CompletionOptions, EndpointKind, Prompt, ResponseChunk, Role};
