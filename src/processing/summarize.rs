//! Role-framed summarization over a pluggable backend.

use super::roles::role_framing;
use super::types::{Language, StructuredSummary, SummaryRequest, TextChunk};
use crate::summarization::{SummarizationClient, SummarizationClientError, SummarizationInput};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

const TRUNCATION_MARKER_ZH: &str = "…（已截断）";
const TRUNCATION_MARKER_EN: &str = "... (truncated)";

/// Errors surfaced by the summarization stage.
#[derive(Debug, Error)]
pub enum SummarizationError {
    /// The backend failed or answered with something unusable.
    #[error(transparent)]
    Client(#[from] SummarizationClientError),
    /// The backend did not answer before the deadline.
    #[error("summarization timed out after {0:?}")]
    Timeout(Duration),
    /// The backend answered with a summary missing required content.
    #[error("malformed summary: {0}")]
    Malformed(String),
    /// There was nothing to summarize.
    #[error("no chunks to summarize")]
    EmptyInput,
}

/// Frames the request by role, calls the backend once and bounds the narrative.
#[derive(Clone)]
pub struct Summarizer {
    client: Arc<dyn SummarizationClient>,
    timeout: Duration,
}

impl Summarizer {
    /// Summarizer over `client`, giving each call at most `timeout`.
    pub fn new(client: Arc<dyn SummarizationClient>, timeout: Duration) -> Self {
        Self { client, timeout }
    }

    /// Backend identifier reported as `aiModelUsed`.
    pub fn model_label(&self) -> String {
        self.client.model_label()
    }

    /// Summarize `chunks` for `request`. No retry on failure.
    pub async fn summarize(
        &self,
        chunks: &[TextChunk],
        request: &SummaryRequest,
    ) -> Result<StructuredSummary, SummarizationError> {
        if chunks.is_empty() {
            return Err(SummarizationError::EmptyInput);
        }
        let input = SummarizationInput {
            request: request.clone(),
            framing: role_framing(&request.role, request.language).to_string(),
            chunks: chunks.to_vec(),
        };

        let mut summary = tokio::time::timeout(self.timeout, self.client.summarize(&input))
            .await
            .map_err(|_| SummarizationError::Timeout(self.timeout))??;

        if summary.narrative.trim().is_empty() {
            return Err(SummarizationError::Malformed(
                "backend returned an empty narrative".into(),
            ));
        }
        if summary.title.trim().is_empty() {
            summary.title = default_title(request.language).to_string();
        }
        summary.narrative = bound_narrative(&summary.narrative, request.max_length, request.language);
        Ok(summary)
    }
}

fn default_title(language: Language) -> &'static str {
    match language {
        Language::ZhCn => "文档智能总结",
        Language::EnUs => "Document Summary",
    }
}

/// Cut `narrative` so that, marker included, it fits in `max_chars` characters.
pub(crate) fn bound_narrative(narrative: &str, max_chars: usize, language: Language) -> String {
    let trimmed = narrative.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let marker = match language {
        Language::ZhCn => TRUNCATION_MARKER_ZH,
        Language::EnUs => TRUNCATION_MARKER_EN,
    };
    let keep = max_chars.saturating_sub(marker.chars().count());
    let mut bounded: String = trimmed.chars().take(keep).collect();
    bounded.truncate(bounded.trim_end().len());
    bounded.push_str(marker);
    bounded
}
