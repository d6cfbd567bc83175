//! Core data types and error definitions for the summarization pipeline.

use crate::{extraction::ExtractionError, ocr::OcrError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

use super::{format::FormatError, summarize::SummarizationError};

/// A PDF on disk, captured once at pipeline start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    path: PathBuf,
    byte_size: u64,
    modified: Option<SystemTime>,
}

impl Document {
    /// Describe a document from its path and file metadata.
    pub fn new(path: impl Into<PathBuf>, byte_size: u64, modified: Option<SystemTime>) -> Self {
        Self {
            path: path.into(),
            byte_size,
            modified,
        }
    }

    /// Stat the file and describe it.
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let metadata = tokio::fs::metadata(path).await?;
        Ok(Self::new(path, metadata.len(), metadata.modified().ok()))
    }

    /// Location of the PDF.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File size in bytes.
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Last modification time, when the platform reports one.
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }
}

/// How the final document text was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// Encoded text pulled straight from the PDF.
    Text,
    /// Page images run through OCR.
    Scanned,
}

impl SourceType {
    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Scanned => "scanned",
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final text of a document together with the path that produced it.
///
/// Built exactly once per run; the source type cannot change afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractionResult {
    raw_text: String,
    page_count: u32,
    source_type: SourceType,
}

impl ExtractionResult {
    pub(crate) fn new(raw_text: String, page_count: u32, source_type: SourceType) -> Self {
        Self {
            raw_text,
            page_count,
            source_type,
        }
    }

    /// Unprocessed text as returned by the extractor or recognizer.
    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    /// Number of pages in the document (or recognized pages when unknown).
    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Whether the text came from the text layer or from OCR.
    pub fn source_type(&self) -> SourceType {
        self.source_type
    }
}

/// A bounded, sentence-aligned slice of normalized text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextChunk {
    /// Zero-based position in document order.
    pub index: usize,
    /// Chunk text.
    pub content: String,
    /// Length of `content` in characters.
    pub approx_length: usize,
}

/// Perspective the summary is written from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Role {
    /// Legal counsel.
    Lawyer,
    /// Learner.
    Student,
    /// Academic reader.
    Researcher,
    /// Decision maker.
    Manager,
    /// Data-oriented reader.
    Analyst,
    /// Any other label supplied by the caller.
    Other(String),
}

impl Role {
    /// Parse a caller-supplied role; unknown labels are preserved as [`Role::Other`].
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "lawyer" => Self::Lawyer,
            "student" => Self::Student,
            "researcher" => Self::Researcher,
            "manager" => Self::Manager,
            "analyst" => Self::Analyst,
            _ => Self::Other(value.trim().to_string()),
        }
    }

    /// Label used in prompts, logs and responses.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Lawyer => "lawyer",
            Self::Student => "student",
            Self::Researcher => "researcher",
            Self::Manager => "manager",
            Self::Analyst => "analyst",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Requested level of detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SummaryLevel {
    /// A few headline points.
    Brief,
    /// Balanced coverage.
    Standard,
    /// Exhaustive coverage.
    #[default]
    Detailed,
}

impl SummaryLevel {
    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Standard => "standard",
            Self::Detailed => "detailed",
        }
    }
}

/// Rendering target for the formatted output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Markdown document.
    #[default]
    Markdown,
    /// Pretty-printed JSON.
    Json,
    /// Plain text.
    Text,
}

impl OutputFormat {
    /// File extension (with the leading dot) for persisted output.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => ".md",
            Self::Json => ".json",
            Self::Text => ".txt",
        }
    }
}

/// Summary language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Language {
    /// Simplified Chinese.
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    /// US English.
    #[serde(rename = "en-US")]
    EnUs,
}

impl Language {
    /// BCP 47 tag.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ZhCn => "zh-CN",
            Self::EnUs => "en-US",
        }
    }
}

/// Tesseract language pack used by the OCR fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum OcrLanguage {
    /// Simplified Chinese.
    #[default]
    #[serde(rename = "chi_sim")]
    ChiSim,
    /// English.
    #[serde(rename = "eng")]
    Eng,
    /// Mixed Chinese and English.
    #[serde(rename = "chi_sim+eng")]
    ChiSimEng,
}

impl OcrLanguage {
    /// Tag passed to the recognizer.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ChiSim => "chi_sim",
            Self::Eng => "eng",
            Self::ChiSimEng => "chi_sim+eng",
        }
    }
}

/// Caller intent handed to the summarizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRequest {
    /// Reader perspective.
    pub role: Role,
    /// Free-text description of what the reader needs.
    pub goal: String,
    /// Level of detail.
    pub level: SummaryLevel,
    /// Sections or topics to emphasize.
    pub focus_areas: Vec<String>,
    /// Output language.
    pub language: Language,
    /// Upper bound on the narrative, in characters.
    pub max_length: usize,
}

/// Relative weight of a key point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    /// Must read.
    High,
    /// Worth reading.
    #[default]
    Medium,
    /// Background.
    Low,
}

impl Importance {
    /// Stable lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// One finding in a structured summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPoint {
    /// Grouping label.
    pub category: String,
    /// Finding text.
    pub content: String,
    /// Relative weight.
    #[serde(default)]
    pub importance: Importance,
    /// One-based page numbers the finding refers to.
    #[serde(default, alias = "pageRefs")]
    pub page_references: Vec<u32>,
}

/// Risk buckets attached to a summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RiskAssessment {
    /// Issues that need immediate attention.
    #[serde(default)]
    pub high_risk: Vec<String>,
    /// Issues worth tracking.
    #[serde(default)]
    pub medium_risk: Vec<String>,
    /// Suggested next steps.
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl RiskAssessment {
    /// True when no bucket has entries.
    pub fn is_empty(&self) -> bool {
        self.high_risk.is_empty() && self.medium_risk.is_empty() && self.recommendations.is_empty()
    }
}

/// Role-conditioned summary of a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredSummary {
    /// Summary title.
    pub title: String,
    /// Ordered findings.
    #[serde(default)]
    pub key_points: Vec<KeyPoint>,
    /// Risk buckets.
    #[serde(default)]
    pub risk_assessment: RiskAssessment,
    /// Prose summary bounded by the requested length.
    #[serde(alias = "summary")]
    pub narrative: String,
}

/// Pipeline states, in the only order they may be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading the text layer.
    Extracting,
    /// Deciding between the text and OCR paths.
    DetectingScan,
    /// Rasterizing and recognizing pages.
    OcrRecognizing,
    /// Normalizing text.
    Preprocessing,
    /// Splitting text into chunks.
    Chunking,
    /// Calling the text-understanding backend.
    Summarizing,
    /// Rendering and persisting output.
    Formatting,
    /// Terminal success state.
    Done,
}

impl PipelineStage {
    /// Stable label for logs and responses.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Extracting => "extracting",
            Self::DetectingScan => "detecting_scan",
            Self::OcrRecognizing => "ocr_recognizing",
            Self::Preprocessing => "preprocessing",
            Self::Chunking => "chunking",
            Self::Summarizing => "summarizing",
            Self::Formatting => "formatting",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Wall time spent in one stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StageTiming {
    /// Stage that ran.
    pub stage: PipelineStage,
    /// Milliseconds spent in it.
    pub elapsed_ms: u64,
}

/// Facts about how a run processed its document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingMeta {
    /// `text` or `scanned`.
    pub pdf_type: SourceType,
    /// Page count reported by extraction or OCR.
    pub page_count: u32,
    /// Total wall time of the run.
    pub elapsed_ms: u64,
    /// Whether OCR produced the text.
    pub ocr_used: bool,
    /// Number of chunks summarized.
    pub chunk_count: usize,
    /// Backend that produced the summary.
    pub ai_model_used: String,
    /// Persisted output location, when output writing is enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    /// Per-stage wall time in execution order.
    pub stage_timings: Vec<StageTiming>,
    /// RFC 3339 completion timestamp.
    pub completed_at: String,
}

/// Terminal artifact of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineResult {
    /// Structured summary.
    pub summary: StructuredSummary,
    /// Processing facts.
    pub processing_meta: ProcessingMeta,
    /// Extracted text, present when the caller asked for it.
    pub original_text: Option<String>,
}

/// Errors produced while splitting text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Chunking was configured with an impossible size.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
}

/// Stable error codes exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    /// Missing, unreadable or corrupt document, or output that could not be written.
    #[serde(rename = "FILE_ERROR")]
    File,
    /// Rasterization or recognition failure.
    #[serde(rename = "OCR_ERROR")]
    Ocr,
    /// Text-understanding backend failure.
    #[serde(rename = "AI_PROCESSING_ERROR")]
    AiProcessing,
    /// Bad request fields.
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    /// Anything else.
    #[serde(rename = "PROCESSING_ERROR")]
    Processing,
}

impl ErrorCode {
    /// Wire representation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "FILE_ERROR",
            Self::Ocr => "OCR_ERROR",
            Self::AiProcessing => "AI_PROCESSING_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Processing => "PROCESSING_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a validation issue concerns the request fields or the file on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueKind {
    /// A request field is missing or out of range.
    Field,
    /// The referenced document is missing, not a PDF or too large.
    File,
}

/// A single rejected request field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Field name as exposed to callers.
    pub field: &'static str,
    /// Human-readable explanation.
    pub message: String,
    /// Field or file problem.
    pub kind: IssueKind,
}

/// Request rejected before the pipeline started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    issues: Vec<ValidationIssue>,
}

impl ValidationError {
    pub(crate) fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// Every issue found, in field order.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    /// `FILE_ERROR` when only the document itself was at fault, otherwise `VALIDATION_ERROR`.
    pub fn code(&self) -> ErrorCode {
        if !self.issues.is_empty() && self.issues.iter().all(|issue| issue.kind == IssueKind::File)
        {
            ErrorCode::File
        } else {
            ErrorCode::Validation
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let described = self
            .issues
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&described)
    }
}

impl std::error::Error for ValidationError {}

/// Errors emitted by the summarization pipeline.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Request rejected before any stage ran.
    #[error("Invalid request: {0}")]
    Validation(#[from] ValidationError),
    /// Text layer could not be read and OCR was not an option.
    #[error("PDF text extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    /// OCR fallback failed.
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    /// Extraction and OCR produced no usable text.
    #[error("Document content is empty or could not be recognized")]
    EmptyContent,
    /// Normalized text could not be chunked.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Text-understanding backend failed.
    #[error("AI summarization failed: {0}")]
    Summarization(#[from] SummarizationError),
    /// Formatted output could not be persisted.
    #[error("Failed to write summary output: {0}")]
    Output(#[from] FormatError),
}

impl PipelineError {
    /// Map the failure onto its stable caller-facing code.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Validation(error) => error.code(),
            Self::Extraction(_) | Self::Output(_) => ErrorCode::File,
            Self::Ocr(_) => ErrorCode::Ocr,
            Self::Summarization(_) => ErrorCode::AiProcessing,
            Self::EmptyContent | Self::Chunking(_) => ErrorCode::Processing,
        }
    }
}

/// A run that ended in the `Failed` state.
#[derive(Debug)]
pub struct PipelineFailure {
    /// Stage that was running when the failure occurred; `None` for validation.
    pub stage: Option<PipelineStage>,
    /// Underlying error.
    pub error: PipelineError,
}

impl fmt::Display for PipelineFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = self.stage.map(PipelineStage::as_str).unwrap_or("validation");
        write!(f, "{} (stage: {stage})", self.error)
    }
}

impl std::error::Error for PipelineFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

impl PipelineFailure {
    pub(crate) fn at(stage: PipelineStage, error: impl Into<PipelineError>) -> Self {
        Self {
            stage: Some(stage),
            error: error.into(),
        }
    }

    /// Stable code for the failure.
    pub fn code(&self) -> ErrorCode {
        self.error.code()
    }
}

impl From<ValidationError> for PipelineFailure {
    fn from(error: ValidationError) -> Self {
        Self {
            stage: None,
            error: PipelineError::Validation(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_codes_serialize_to_stable_strings() {
        let codes = [
            ErrorCode::File,
            ErrorCode::Ocr,
            ErrorCode::AiProcessing,
            ErrorCode::Validation,
            ErrorCode::Processing,
        ];
        for code in codes {
            let json = serde_json::to_value(code).expect("serialize");
            assert_eq!(json, serde_json::Value::String(code.as_str().into()));
        }
    }

    #[test]
    fn role_parse_keeps_unknown_labels() {
        assert_eq!(Role::parse(" Lawyer "), Role::Lawyer);
        assert_eq!(Role::parse("auditor"), Role::Other("auditor".into()));
        assert_eq!(Role::parse("auditor").as_str(), "auditor");
    }

    #[test]
    fn validation_code_depends_on_issue_kinds() {
        let file_only = ValidationError::new(vec![ValidationIssue {
            field: "documentPath",
            message: "missing".into(),
            kind: IssueKind::File,
        }]);
        assert_eq!(file_only.code(), ErrorCode::File);

        let mixed = ValidationError::new(vec![
            ValidationIssue {
                field: "documentPath",
                message: "missing".into(),
                kind: IssueKind::File,
            },
            ValidationIssue {
                field: "goal",
                message: "too long".into(),
                kind: IssueKind::Field,
            },
        ]);
        assert_eq!(mixed.code(), ErrorCode::Validation);
        assert!(mixed.to_string().contains("goal: too long"));
    }

    #[test]
    fn structured_summary_accepts_legacy_field_names() {
        let json = serde_json::json!({
            "title": "t",
            "keyPoints": [{"category": "c", "content": "x", "importance": "high", "pageRefs": [1, 2]}],
            "riskAssessment": {"highRisk": ["r"]},
            "summary": "body"
        });
        let summary: StructuredSummary = serde_json::from_value(json).expect("parse");
        assert_eq!(summary.narrative, "body");
        assert_eq!(summary.key_points[0].page_references, vec![1, 2]);
        assert!(summary.risk_assessment.medium_risk.is_empty());
    }
}
