use super::prompt::{PromptBudget, build_prompt};
use super::{SummarizationClient, SummarizationClientError, SummarizationInput};
use crate::processing::StructuredSummary;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;

/// Structured summaries generated by a local Ollama runtime in JSON mode.
pub struct OllamaSummarizationClient {
    http: Client,
    base_url: String,
    model: String,
    budget: PromptBudget,
}

impl OllamaSummarizationClient {
    /// Client for `model` served at `base_url`, packing prompts into `context_tokens`.
    pub fn new(
        base_url: String,
        model: String,
        context_tokens: usize,
    ) -> Result<Self, SummarizationClientError> {
        let http = Client::builder()
            .user_agent("smartsum/summary")
            .build()
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to construct HTTP client: {error}"
                ))
            })?;
        Ok(Self {
            http,
            base_url,
            model,
            budget: PromptBudget::new(context_tokens),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl SummarizationClient for OllamaSummarizationClient {
    async fn summarize(
        &self,
        input: &SummarizationInput,
    ) -> Result<StructuredSummary, SummarizationClientError> {
        let prompt = build_prompt(input, &self.budget);
        if prompt.chunks_included == 0 {
            return Err(SummarizationClientError::GenerationFailed(
                "no document text fits in the prompt".into(),
            ));
        }
        tracing::debug!(
            model = %self.model,
            chunks = prompt.chunks_included,
            "Requesting structured summary from Ollama"
        );

        let payload = json!({
            "model": self.model,
            "prompt": prompt.text,
            "stream": false,
            "format": "json",
            "options": {
                "temperature": 0.1,
            }
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                SummarizationClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(SummarizationClientError::ProviderUnavailable(format!(
                "Ollama endpoint {} returned 404 (is model '{}' pulled?)",
                self.endpoint(),
                self.model
            )));
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(SummarizationClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(SummarizationClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        serde_json::from_str(body.response.trim()).map_err(|error| {
            SummarizationClientError::InvalidResponse(format!(
                "model output is not a structured summary: {error}"
            ))
        })
    }

    fn model_label(&self) -> String {
        format!("ollama:{}", self.model)
    }
}
