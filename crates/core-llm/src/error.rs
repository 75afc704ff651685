// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// Error taxonomy for the LLM Gateway (§7). Transient kinds are retried
/// per policy by `call_with_policy`; fatal kinds propagate to the caller
/// on the first attempt.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("transient provider error: {0}")]
    Transient(String),

    #[error("fatal provider error: {0}")]
    Fatal(String),

    #[error("rate limited: {0}")]
    LlmRateLimited(String),

    #[error("circuit open for endpoint {endpoint}")]
    CircuitOpen { endpoint: String },

    #[error("could not extract JSON from model response")]
    JsonExtractFailed { raw_text: String },

    #[error("operation cancelled")]
    Cancelled,
}

impl LlmError {
    /// Classifies an HTTP status per §4.3: timeouts, 5xx, 429 without
    /// `Retry-After`, and transport failures are transient; everything
    /// else (4xx except 429) is fatal.
    pub fn from_status(status: u16, retry_after_present: bool, body: String) -> Self {
        match status {
            429 if !retry_after_present => LlmError::Transient(body),
            429 => LlmError::LlmRateLimited(body),
            500..=599 => LlmError::Transient(body),
            400..=499 => LlmError::Fatal(body),
            _ => LlmError::Transient(body),
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, LlmError::Transient(_))
    }
}
