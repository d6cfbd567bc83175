//! The summarization pipeline state machine.
//!
//! A run moves strictly forward through
//! `Extracting → DetectingScan → (OcrRecognizing) → Preprocessing → Chunking → Summarizing →
//! Formatting → Done`, or stops at the first failure. Either the text layer or OCR supplies the
//! document text, never both. Every stage records its wall time; a failed run returns only the
//! failure, discarding whatever earlier stages produced.
//!
//! [`Pipeline`] owns long-lived handles to the capabilities (extractor, rasterizer, OCR engine,
//! summarization backend) and the metrics registry so that HTTP, MCP and the CLI share them.
//! Independent documents may run concurrently on the same instance; runs share no mutable state
//! beyond the atomic counters and the optional extraction cache.

use super::chunking::Chunker;
use super::format::{self, ResultFormatter};
use super::preprocess::TextPreprocessor;
use super::response::ToolResponse;
use super::scan::ScanDetector;
use super::summarize::Summarizer;
use super::types::{
    ExtractionResult, PipelineError, PipelineFailure, PipelineResult, PipelineStage,
    ProcessingMeta, SourceType, StageTiming,
};
use super::validate::{SummarizeParams, ValidatedRequest, ValidationLimits, validate, validate_value};
use crate::config::Config;
use crate::extraction::{CachingExtractor, ExtractedText, PdfTextExtractor, TextExtractor};
use crate::metrics::{MetricsSnapshot, PipelineMetrics};
use crate::ocr::{OcrEngine, OcrFallback, OcrSettings, PageRasterizer, PopplerRasterizer, TesseractEngine};
use crate::summarization::{SummarizationClient, SummarizationClientError, build_summarization_client};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::Instrument;
use uuid::Uuid;

/// External capabilities the pipeline drives.
#[derive(Clone)]
pub struct PipelineComponents {
    /// Text-layer extractor.
    pub extractor: Arc<dyn TextExtractor>,
    /// Page rasterizer for OCR.
    pub rasterizer: Arc<dyn PageRasterizer>,
    /// OCR engine.
    pub ocr_engine: Arc<dyn OcrEngine>,
    /// Structured-summary backend.
    pub summarization_client: Arc<dyn SummarizationClient>,
}

impl PipelineComponents {
    /// Production capabilities selected by `config`.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationClientError> {
        let extractor: Arc<dyn TextExtractor> = if config.extraction_cache {
            Arc::new(CachingExtractor::new(PdfTextExtractor::new()))
        } else {
            Arc::new(PdfTextExtractor::new())
        };
        Ok(Self {
            extractor,
            rasterizer: Arc::new(PopplerRasterizer::new(config.ocr_rasterizer_bin.clone())),
            ocr_engine: Arc::new(TesseractEngine::new(config.ocr_tesseract_bin.clone())),
            summarization_client: build_summarization_client(config)?,
        })
    }
}

/// Runtime knobs for a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Characters per page below which OCR runs.
    pub scan_density_threshold: usize,
    /// OCR page budget, resolution and deadline.
    pub ocr: OcrSettings,
    /// Deadline for the summarization backend.
    pub summarization_timeout: Duration,
    /// Cap on original text in rendered output.
    pub original_text_cap: usize,
    /// Text normalization policy.
    pub preprocessor: TextPreprocessor,
    /// Persist rendered output next to the document.
    pub write_output: bool,
    /// Request validation limits.
    pub limits: ValidationLimits,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

impl PipelineSettings {
    /// Derive settings from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_size: config.chunk_size,
            scan_density_threshold: config.scan_density_threshold,
            ocr: OcrSettings {
                page_budget: config.ocr_page_budget,
                dpi: config.ocr_dpi,
                timeout: Duration::from_secs(config.ocr_timeout_secs),
            },
            summarization_timeout: Duration::from_secs(config.summarization_timeout_secs),
            original_text_cap: config.original_text_cap,
            preprocessor: TextPreprocessor::from_config(config),
            write_output: config.write_output,
            limits: ValidationLimits {
                max_document_bytes: config.max_document_mb.saturating_mul(1024 * 1024),
            },
        }
    }
}

/// Effective settings as reported to operators.
#[derive(Debug, Clone, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSnapshot {
    /// Maximum characters per chunk.
    pub chunk_size: usize,
    /// Scan density threshold (characters per page).
    pub scan_density_threshold: usize,
    /// OCR page budget.
    pub ocr_page_budget: u32,
    /// OCR rasterization resolution.
    pub ocr_dpi: u32,
    /// OCR deadline in seconds.
    pub ocr_timeout_secs: u64,
    /// Summarization deadline in seconds.
    pub summarization_timeout_secs: u64,
    /// Cap on original text in rendered output.
    pub original_text_cap: usize,
    /// Largest accepted document in bytes.
    pub max_document_bytes: u64,
    /// Whether rendered output is persisted.
    pub write_output: bool,
    /// Summarization backend identifier.
    pub ai_model: String,
}

/// Abstraction over the pipeline used by external surfaces (HTTP, MCP, CLI).
#[async_trait]
pub trait PipelineApi: Send + Sync {
    /// Validate and run a raw JSON request, always answering with an envelope.
    async fn summarize(&self, request: serde_json::Value) -> ToolResponse;

    /// Current pipeline counters.
    fn metrics_snapshot(&self) -> MetricsSnapshot;

    /// Effective settings.
    fn settings_snapshot(&self) -> SettingsSnapshot;
}

/// Coordinates every stage of a summarize request.
pub struct Pipeline {
    components: PipelineComponents,
    settings: PipelineSettings,
    metrics: Arc<PipelineMetrics>,
}

impl Pipeline {
    /// Pipeline over `components` with `settings`.
    pub fn new(components: PipelineComponents, settings: PipelineSettings) -> Self {
        Self {
            components,
            settings,
            metrics: Arc::new(PipelineMetrics::new()),
        }
    }

    /// Production pipeline described by `config`.
    pub fn from_config(config: &Config) -> Result<Self, SummarizationClientError> {
        let components = PipelineComponents::from_config(config)?;
        tracing::info!(
            ai_model = %components.summarization_client.model_label(),
            extraction_cache = config.extraction_cache,
            "Pipeline components initialized"
        );
        Ok(Self::new(components, PipelineSettings::from_config(config)))
    }

    /// Effective settings.
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Shared metrics registry.
    pub fn metrics(&self) -> Arc<PipelineMetrics> {
        self.metrics.clone()
    }

    /// Validate a raw JSON request and run it.
    pub async fn execute(&self, request: serde_json::Value) -> ToolResponse {
        match validate_value(request, self.settings.limits).await {
            Ok(validated) => self.execute_validated(validated).await,
            Err(error) => reject(error),
        }
    }

    /// Validate typed parameters and run them.
    pub async fn execute_params(&self, params: SummarizeParams) -> ToolResponse {
        match validate(params, self.settings.limits).await {
            Ok(validated) => self.execute_validated(validated).await,
            Err(error) => reject(error),
        }
    }

    async fn execute_validated(&self, request: ValidatedRequest) -> ToolResponse {
        match self.run(&request).await {
            Ok(result) => ToolResponse::success(result, request.document.path(), &request.summary),
            Err(failure) => ToolResponse::failure(&failure),
        }
    }

    /// Run every stage for an already validated request.
    pub async fn run(&self, request: &ValidatedRequest) -> Result<PipelineResult, PipelineFailure> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "pipeline",
            %run_id,
            document = %request.document.path().display()
        );
        let started = Instant::now();
        let outcome = self.run_stages(request, started).instrument(span.clone()).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let _entered = span.enter();
        match &outcome {
            Ok(result) => {
                self.metrics.record_success(
                    result.processing_meta.chunk_count as u64,
                    result.processing_meta.ocr_used,
                    elapsed_ms,
                );
                tracing::info!(
                    elapsed_ms,
                    pdf_type = %result.processing_meta.pdf_type,
                    chunks = result.processing_meta.chunk_count,
                    "Pipeline completed"
                );
            }
            Err(failure) => {
                self.metrics.record_failure(elapsed_ms);
                tracing::warn!(
                    elapsed_ms,
                    code = %failure.code(),
                    error = %failure,
                    "Pipeline failed"
                );
            }
        }
        outcome
    }

    async fn run_stages(
        &self,
        request: &ValidatedRequest,
        started: Instant,
    ) -> Result<PipelineResult, PipelineFailure> {
        let document = &request.document;
        let mut clock = StageClock::new();

        clock.enter(PipelineStage::Extracting);
        let extracted = self.components.extractor.extract(document).await;

        clock.enter(PipelineStage::DetectingScan);
        let detector = ScanDetector::new(self.settings.scan_density_threshold);
        let source = match extracted {
            Ok(text) => {
                let decision = detector.decide(text.char_count(), text.page_count, request.enable_ocr);
                tracing::debug!(
                    pages = text.page_count,
                    chars = text.char_count(),
                    density = text.density(),
                    use_ocr = decision.use_ocr,
                    "Scan decision"
                );
                if decision.use_ocr {
                    TextSource::Ocr {
                        known_pages: text.page_count,
                    }
                } else {
                    TextSource::Layer(text)
                }
            }
            Err(error) => {
                if !detector.decide_after_failure(request.enable_ocr).use_ocr {
                    return Err(PipelineFailure::at(PipelineStage::Extracting, error));
                }
                tracing::warn!(error = %error, "Text layer unreadable; falling back to OCR");
                TextSource::Ocr { known_pages: 0 }
            }
        };

        let extraction = match source {
            TextSource::Layer(text) => {
                ExtractionResult::new(text.text, text.page_count, SourceType::Text)
            }
            TextSource::Ocr { known_pages } => {
                clock.enter(PipelineStage::OcrRecognizing);
                let fallback = OcrFallback::new(
                    self.components.rasterizer.as_ref(),
                    self.components.ocr_engine.as_ref(),
                    self.settings.ocr,
                );
                let recognized = fallback
                    .recognize(document, request.ocr_language, known_pages)
                    .await
                    .map_err(|error| PipelineFailure::at(PipelineStage::OcrRecognizing, error))?;
                let page_count = if known_pages > 0 {
                    known_pages
                } else {
                    recognized.pages_recognized
                };
                ExtractionResult::new(recognized.text, page_count, SourceType::Scanned)
            }
        };

        clock.enter(PipelineStage::Preprocessing);
        let normalized = self.settings.preprocessor.normalize(extraction.raw_text());
        if normalized.is_empty() {
            return Err(PipelineFailure::at(
                PipelineStage::Preprocessing,
                PipelineError::EmptyContent,
            ));
        }

        clock.enter(PipelineStage::Chunking);
        let chunks = Chunker::new(self.settings.chunk_size)
            .map_err(|error| PipelineFailure::at(PipelineStage::Chunking, error))?
            .chunk(&normalized);
        if chunks.is_empty() {
            return Err(PipelineFailure::at(
                PipelineStage::Chunking,
                PipelineError::EmptyContent,
            ));
        }
        tracing::debug!(chunks = chunks.len(), chars = normalized.chars().count(), "Chunked text");

        clock.enter(PipelineStage::Summarizing);
        let summarizer = Summarizer::new(
            self.components.summarization_client.clone(),
            self.settings.summarization_timeout,
        );
        let summary = summarizer
            .summarize(&chunks, &request.summary)
            .await
            .map_err(|error| PipelineFailure::at(PipelineStage::Summarizing, error))?;

        clock.enter(PipelineStage::Formatting);
        let formatter = ResultFormatter::new(request.summary.language)
            .with_original_cap(self.settings.original_text_cap);
        let output_path = if self.settings.write_output {
            let rendered = formatter
                .format(
                    &summary,
                    extraction.raw_text(),
                    request.output_format,
                    request.include_original_text,
                )
                .map_err(|error| PipelineFailure::at(PipelineStage::Formatting, error))?;
            let path = format::output_path(document.path(), request.output_format);
            format::persist(&path, &rendered)
                .await
                .map_err(|error| PipelineFailure::at(PipelineStage::Formatting, error))?;
            tracing::debug!(output = %path.display(), "Summary written");
            Some(path)
        } else {
            None
        };

        clock.enter(PipelineStage::Done);
        let stage_timings = clock.finish();
        let pdf_type = extraction.source_type();
        let page_count = extraction.page_count();
        let original_text = request
            .include_original_text
            .then(|| formatter.cap_original(extraction.raw_text()));

        Ok(PipelineResult {
            summary,
            processing_meta: ProcessingMeta {
                pdf_type,
                page_count,
                elapsed_ms: started.elapsed().as_millis() as u64,
                ocr_used: pdf_type == SourceType::Scanned,
                chunk_count: chunks.len(),
                ai_model_used: summarizer.model_label(),
                output_path,
                stage_timings,
                completed_at: OffsetDateTime::now_utc()
                    .format(&Rfc3339)
                    .unwrap_or_default(),
            },
            original_text,
        })
    }
}

#[async_trait]
impl PipelineApi for Pipeline {
    async fn summarize(&self, request: serde_json::Value) -> ToolResponse {
        self.execute(request).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn settings_snapshot(&self) -> SettingsSnapshot {
        SettingsSnapshot {
            chunk_size: self.settings.chunk_size,
            scan_density_threshold: self.settings.scan_density_threshold,
            ocr_page_budget: self.settings.ocr.page_budget,
            ocr_dpi: self.settings.ocr.dpi,
            ocr_timeout_secs: self.settings.ocr.timeout.as_secs(),
            summarization_timeout_secs: self.settings.summarization_timeout.as_secs(),
            original_text_cap: self.settings.original_text_cap,
            max_document_bytes: self.settings.limits.max_document_bytes,
            write_output: self.settings.write_output,
            ai_model: self.components.summarization_client.model_label(),
        }
    }
}

fn reject(error: super::types::ValidationError) -> ToolResponse {
    tracing::info!(error = %error, "Request rejected");
    ToolResponse::failure(&PipelineFailure::from(error))
}

enum TextSource {
    Layer(ExtractedText),
    Ocr { known_pages: u32 },
}

/// Forward-only stage tracker recording wall time per stage.
struct StageClock {
    current: Option<(PipelineStage, Instant)>,
    timings: Vec<StageTiming>,
}

impl StageClock {
    fn new() -> Self {
        Self {
            current: None,
            timings: Vec::new(),
        }
    }

    fn enter(&mut self, stage: PipelineStage) {
        if let Some((previous, _)) = self.current {
            debug_assert!(stage > previous, "stage {stage} entered after {previous}");
        }
        self.close_current();
        tracing::debug!(stage = stage.as_str(), "Entering stage");
        self.current = Some((stage, Instant::now()));
    }

    fn close_current(&mut self) {
        if let Some((stage, entered)) = self.current.take() {
            self.timings.push(StageTiming {
                stage,
                elapsed_ms: entered.elapsed().as_millis() as u64,
            });
        }
    }

    /// Close the clock; `Done` itself is terminal and not timed.
    fn finish(mut self) -> Vec<StageTiming> {
        if matches!(self.current, Some((PipelineStage::Done, _))) {
            self.current = None;
        }
        self.close_current();
        self.timings
    }
}
