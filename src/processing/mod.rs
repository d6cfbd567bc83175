//! Document pipeline: scan detection, normalization, chunking, summarization, rendering and the
//! state machine tying them together.

pub mod chunking;
pub mod format;
mod pipeline;
pub mod preprocess;
pub mod response;
pub mod roles;
pub mod scan;
pub mod summarize;
pub mod types;
pub mod validate;

pub use pipeline::{Pipeline, PipelineApi, PipelineComponents, PipelineSettings, SettingsSnapshot};
pub use response::ToolResponse;
pub use types::{
    ChunkingError, Document, ErrorCode, ExtractionResult, Importance, IssueKind, KeyPoint,
    Language, OcrLanguage, OutputFormat, PipelineError, PipelineFailure, PipelineResult,
    PipelineStage, ProcessingMeta, RiskAssessment, Role, SourceType, StageTiming,
    StructuredSummary, SummaryLevel, SummaryRequest, TextChunk, ValidationError, ValidationIssue,
};
pub use validate::{SummarizeParams, ValidatedRequest, ValidationLimits};
