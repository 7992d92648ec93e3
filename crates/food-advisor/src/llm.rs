//! Language-model seam.
//!
//! The synthesizer only sees [`LanguageModel`]; production wires in the
//! OpenAI-compatible client, tests substitute canned responses.

use advisor_common::openai::{OpenAiClient, OpenAiClientError};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("model returned no completion")]
    EmptyCompletion,
}

/// A text-completion provider.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Generate a single completion for `prompt`.
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError>;

    fn model_name(&self) -> &str;
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, prompt: &str, temperature: f32) -> Result<String, LlmError> {
        OpenAiClient::complete(self, prompt, temperature)
            .await
            .map_err(|e| match e {
                OpenAiClientError::EmptyCompletion => LlmError::EmptyCompletion,
                other => LlmError::RequestFailed(other.to_string()),
            })
    }

    fn model_name(&self) -> &str {
        &self.config().model
    }
}
