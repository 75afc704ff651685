// SPDX-License-Identifier: Apache-2.0
use thiserror::Error;

/// §4.9/§6.3: every failure a startup step can raise, distinguishing
/// "bad configuration file" (exit code 2) from any other unrecoverable
/// failure (exit code 1).
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to initialize log sinks: {0}")]
    LogSink(#[from] std::io::Error),

    #[error("bad configuration: {0}")]
    Config(#[from] core_config::ConfigError),

    #[error("failed to construct the LLM gateway: {0}")]
    Llm(#[from] core_llm::LlmError),
}

impl StartupError {
    pub fn is_bad_config(&self) -> bool {
        matches!(self, StartupError::Config(_))
    }
}
