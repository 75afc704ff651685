// SPDX-License-Identifier: Apache-2.0
use std::collections::HashMap;
use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use core_config::ModelConfig;

use crate::circuit_breaker::CircuitBreaker;
use crate::error::LlmError;
use crate::json_extract::extract_json;
use crate::provider::{ModelProvider, ResponseStream};
use crate::providers::{OllamaProvider, OpenAiProvider};
use crate::rate_budget::RateBudget;
use crate::types::{ChatMessage, CompletionOptions, EndpointKind, Prompt};

const MAX_ATTEMPTS: u32 = 5;
const BASE_BACKOFF: Duration = Duration::from_millis(500);

/// Selects local vs. cloud purely from the model name, per §4.3. Models
/// starting with `local:` or `ollama:` route to the local endpoint;
/// everything else goes to the configured cloud endpoint. Call sites
/// never need to know which physical provider answered.
fn select_endpoint(model: &str) -> EndpointKind {
    if model.starts_with("local:") || model.starts_with("ollama:") {
        EndpointKind::Local
    } else {
        EndpointKind::Cloud
    }
}

/// Wraps the two configured providers with rate limiting, retries, and a
/// per-endpoint circuit breaker (§4.3). This is the sole entry point
/// `core-workflow` and `core-tools` use to reach a model.
pub struct LlmGateway {
    providers: HashMap<EndpointKind, Box<dyn ModelProvider>>,
    rate_budgets: HashMap<EndpointKind, RateBudget>,
    circuit_breaker: CircuitBreaker,
}

impl LlmGateway {
    pub fn new(config: &ModelConfig) -> Result<Self, LlmError> {
        let mut providers: HashMap<EndpointKind, Box<dyn ModelProvider>> = HashMap::new();
        providers.insert(EndpointKind::Cloud, Box::new(OpenAiProvider::new(&config.cloud)?));
        providers.insert(EndpointKind::Local, Box::new(OllamaProvider::new(&config.local)?));

        let mut rate_budgets = HashMap::new();
        rate_budgets.insert(
            EndpointKind::Cloud,
            RateBudget::new(config.max_requests_per_minute as usize),
        );
        rate_budgets.insert(
            EndpointKind::Local,
            RateBudget::new(config.max_requests_per_minute as usize),
        );

        Ok(Self {
            providers,
            rate_budgets,
            circuit_breaker: CircuitBreaker::new(),
        })
    }

    /// Constructs a gateway from explicit providers, bypassing network
    /// config entirely. Used by tests to inject `MockProvider`s.
    pub fn from_providers(
        cloud: Box<dyn ModelProvider>,
        local: Box<dyn ModelProvider>,
        max_requests_per_minute: u32,
    ) -> Self {
        let mut providers: HashMap<EndpointKind, Box<dyn ModelProvider>> = HashMap::new();
        providers.insert(EndpointKind::Cloud, cloud);
        providers.insert(EndpointKind::Local, local);

        let mut rate_budgets = HashMap::new();
        rate_budgets.insert(EndpointKind::Cloud, RateBudget::new(max_requests_per_minute as usize));
        rate_budgets.insert(EndpointKind::Local, RateBudget::new(max_requests_per_minute as usize));

        Self {
            providers,
            rate_budgets,
            circuit_breaker: CircuitBreaker::new(),
        }
    }

    fn provider_for(&self, model: &str) -> &dyn ModelProvider {
        self.providers[&select_endpoint(model)].as_ref()
    }

    fn rate_budget_for(&self, model: &str) -> &RateBudget {
        &self.rate_budgets[&select_endpoint(model)]
    }

    /// Rate-budget acquire plus the circuit-breaker gate, shared by every
    /// `complete*` method so the policy is defined exactly once per
    /// SPEC_FULL's C3 note, even though the text and streaming paths
    /// retry differently below.
    async fn acquire_gate(&self, opts: &CompletionOptions) -> Result<(&dyn ModelProvider, String), LlmError> {
        let provider = self.provider_for(&opts.model);
        let endpoint = provider.endpoint().to_string();

        self.rate_budget_for(&opts.model)
            .acquire(std::future::pending())
            .await?;

        Ok((provider, endpoint))
    }

    /// The retry/backoff loop `complete`/`complete_json` funnel through.
    async fn call_with_policy(
        &self,
        messages: &[ChatMessage],
        opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let (provider, endpoint) = self.acquire_gate(opts).await?;

        if !self.circuit_breaker.is_available(&endpoint) {
            warn!(target: "API", endpoint = %endpoint, "circuit open, failing fast");
            if let Some(fallback) = &opts.fallback {
                return Ok(fallback.clone());
            }
            return Err(LlmError::CircuitOpen { endpoint });
        }

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match provider.complete(messages, opts).await {
                Ok(text) => {
                    self.circuit_breaker.record_success(&endpoint);
                    info!(target: "API", endpoint = %endpoint, attempt, "completion succeeded");
                    return Ok(text);
                }
                Err(err) if err.is_transient() => {
                    self.circuit_breaker.record_failure(&endpoint);
                    warn!(target: "API", endpoint = %endpoint, attempt, error = %err, "transient failure");
                    last_error = Some(err);
                    if attempt < MAX_ATTEMPTS {
                        let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(err) => {
                    self.circuit_breaker.record_failure(&endpoint);
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(LlmError::Fatal("retry loop exhausted with no error".into())))
    }

    pub async fn complete(
        &self,
        prompt: impl Into<Prompt>,
        opts: &CompletionOptions,
    ) -> Result<String, LlmError> {
        let messages = prompt.into().into_messages();
        self.call_with_policy(&messages, opts).await
    }

    /// Same rate-budget/circuit-breaker gate as `complete`, but retries
    /// only the call that opens the stream: once a stream is handed back
    /// to the caller its chunks can't be replayed, so there is nothing
    /// left for this loop to retry past that point.
    pub async fn complete_stream(
        &self,
        prompt: impl Into<Prompt>,
        opts: &CompletionOptions,
    ) -> Result<ResponseStream, LlmError> {
        let messages = prompt.into().into_messages();
        let (provider, endpoint) = self.acquire_gate(opts).await?;

        if !self.circuit_breaker.is_available(&endpoint) {
            warn!(target: "API", endpoint = %endpoint, "circuit open, failing fast");
            return Err(LlmError::CircuitOpen { endpoint });
        }

        let mut last_error = None;
        for attempt in 1..=MAX_ATTEMPTS {
            match provider.complete_stream(&messages, opts).await {
                Ok(stream) => {
                    self.circuit_breaker.record_success(&endpoint);
                    info!(target: "API", endpoint = %endpoint, attempt, "stream opened");
                    return Ok(stream);
                }
                Err(err) if err.is_transient() => {
                    self.circuit_breaker.record_failure(&endpoint);
                    warn!(target: "API", endpoint = %endpoint, attempt, error = %err, "transient failure opening stream");
                    last_error = Some(err);
                    if attempt < MAX_ATTEMPTS {
                        let backoff = BASE_BACKOFF * 2u32.pow(attempt - 1);
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(err) => {
                    self.circuit_breaker.record_failure(&endpoint);
                    return Err(err);
                }
            }
        }
        Err(last_error.unwrap_or(LlmError::Fatal("retry loop exhausted with no error".into())))
    }

    /// Calls `complete`, then extracts JSON from the response per the
    /// ladder in [`extract_json`]. Schema violations are not retried
    /// here per §4.3 ("non-transient failures ... schema violations for
    /// JSON mode return immediately"); schema-repair retries belong to
    /// the caller (`core-workflow`'s `ParameterGenerator`), which has
    /// the schema needed to build a repair prompt.
    pub async fn complete_json(
        &self,
        prompt: impl Into<Prompt>,
        opts: &CompletionOptions,
    ) -> Result<Value, LlmError> {
        let text = self.complete(prompt, opts).await?;
        extract_json(&text)
    }
}
