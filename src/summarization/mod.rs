//! Backends that turn document chunks into a structured summary.
//!
//! Two providers are available. The Ollama client asks a local model for a JSON document that
//! matches [`StructuredSummary`]; the extractive client needs no network and derives key points,
//! risk buckets and a narrative deterministically from the chunk text. The processing layer only
//! sees the [`SummarizationClient`] trait.

mod extractive;
mod ollama;
pub(crate) mod prompt;

pub use extractive::ExtractiveSummarizationClient;
pub use ollama::OllamaSummarizationClient;

use crate::config::{Config, SummarizationProvider};
use crate::processing::{StructuredSummary, SummaryRequest, TextChunk};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";

/// Errors surfaced by summarization providers.
#[derive(Debug, Error)]
pub enum SummarizationClientError {
    /// Provider was explicitly disabled or unreachable.
    #[error("Summarization provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate summary: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Everything a provider needs to summarize one document.
#[derive(Debug, Clone)]
pub struct SummarizationInput {
    /// Caller intent.
    pub request: SummaryRequest,
    /// Role-specific instruction prepended to the prompt.
    pub framing: String,
    /// Document chunks in order.
    pub chunks: Vec<TextChunk>,
}

/// Interface implemented by structured-summary providers.
#[async_trait]
pub trait SummarizationClient: Send + Sync {
    /// Produce a structured summary of `input`.
    async fn summarize(
        &self,
        input: &SummarizationInput,
    ) -> Result<StructuredSummary, SummarizationClientError>;

    /// Identifier reported as `aiModelUsed`.
    fn model_label(&self) -> String;
}

/// Build the provider selected by `config`.
pub fn build_summarization_client(
    config: &Config,
) -> Result<Arc<dyn SummarizationClient>, SummarizationClientError> {
    match config.summarization_provider {
        SummarizationProvider::None => Ok(Arc::new(ExtractiveSummarizationClient::new())),
        SummarizationProvider::Ollama => {
            let base_url = config
                .ollama_url
                .clone()
                .unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string());
            let client = OllamaSummarizationClient::new(
                base_url,
                config.summarization_model.clone(),
                config.summarization_context_tokens,
            )?;
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_provider_is_extractive() {
        let client = build_summarization_client(&Config::default()).expect("client");
        assert_eq!(client.model_label(), "extractive");
    }

    #[test]
    fn ollama_provider_reports_model() {
        let config = Config {
            summarization_provider: SummarizationProvider::Ollama,
            summarization_model: "qwen2.5:14b".into(),
            ..Config::default()
        };
        let client = build_summarization_client(&config).expect("client");
        assert_eq!(client.model_label(), "ollama:qwen2.5:14b");
    }
}
