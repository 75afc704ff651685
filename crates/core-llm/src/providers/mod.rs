// SPDX-License-Identifier: Apache-2.0
mod mock;
mod ollama;
mod openai;

pub use mock::{ChunkedMockProvider, MockProvider, ScriptedMockProvider};
pub use ollama::OllamaProvider;
pub use openai::OpenAiProvider;
