//! Caller-facing response envelope: `{success, data}` or `{success, error}`.

use super::types::{
    ErrorCode, KeyPoint, PipelineFailure, PipelineError, PipelineResult, ProcessingMeta,
    RiskAssessment, SummaryLevel, SummaryRequest,
};
use serde::Serialize;
use serde_json::{Value, json};
use std::path::Path;

/// Outcome of one summarize request, successful or not. There is no partial-success shape.
#[derive(Debug, Clone, Serialize)]
pub struct ToolResponse {
    /// Whether the pipeline reached `Done`.
    pub success: bool,
    /// Present on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<SummaryData>,
    /// Present on failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// Structured failure description.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    /// Stable error code.
    pub code: ErrorCode,
    /// Human-readable message.
    pub message: String,
    /// Machine-readable context (failed stage, validation issues, cause chain).
    pub details: Value,
}

/// Successful response payload.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryData {
    /// Summary plus request echo.
    pub summary: SummaryView,
    /// How the document was processed.
    pub processing_info: ProcessingInfo,
    /// Extracted text, only when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_text: Option<String>,
}

/// Structured summary annotated with the request it answers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryView {
    /// Summary title.
    pub title: String,
    /// Role the summary was written for.
    pub user_role: String,
    /// Level of detail requested.
    pub summary_level: SummaryLevel,
    /// Ordered findings.
    pub key_points: Vec<KeyPoint>,
    /// Risk buckets.
    pub risk_assessment: RiskAssessment,
    /// Bounded prose summary.
    pub narrative: String,
    /// Length of the narrative in characters.
    pub word_count: usize,
}

/// Processing facts plus the document location.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingInfo {
    /// Path of the source document.
    pub original_path: String,
    /// Stage and timing details.
    #[serde(flatten)]
    pub meta: ProcessingMeta,
}

impl ToolResponse {
    /// Envelope for a run that reached `Done`.
    pub fn success(result: PipelineResult, document_path: &Path, request: &SummaryRequest) -> Self {
        let PipelineResult {
            summary,
            processing_meta,
            original_text,
        } = result;
        let word_count = summary.narrative.chars().count();
        Self {
            success: true,
            data: Some(SummaryData {
                summary: SummaryView {
                    title: summary.title,
                    user_role: request.role.to_string(),
                    summary_level: request.level,
                    key_points: summary.key_points,
                    risk_assessment: summary.risk_assessment,
                    narrative: summary.narrative,
                    word_count,
                },
                processing_info: ProcessingInfo {
                    original_path: document_path.display().to_string(),
                    meta: processing_meta,
                },
                original_text,
            }),
            error: None,
        }
    }

    /// Envelope for a run that ended in `Failed`.
    pub fn failure(failure: &PipelineFailure) -> Self {
        let details = match &failure.error {
            PipelineError::Validation(validation) => json!({
                "stage": Value::Null,
                "issues": validation
                    .issues()
                    .iter()
                    .map(|issue| json!({"field": issue.field, "message": issue.message}))
                    .collect::<Vec<_>>(),
            }),
            other => json!({
                "stage": failure.stage.map(|stage| stage.as_str()),
                "causes": error_chain(other),
            }),
        };
        Self {
            success: false,
            data: None,
            error: Some(ErrorBody {
                code: failure.code(),
                message: failure.error.to_string(),
                details,
            }),
        }
    }

    /// Error code when the response describes a failure.
    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error.as_ref().map(|error| error.code)
    }

    /// Serialize to a JSON value.
    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or_else(|error| {
            json!({
                "success": false,
                "error": {
                    "code": ErrorCode::Processing,
                    "message": format!("failed to serialize response: {error}"),
                    "details": Value::Null,
                }
            })
        })
    }
}

fn error_chain(error: &dyn std::error::Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = error.source();
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{
        IssueKind, PipelineStage, Role, SourceType, StructuredSummary, ValidationError,
        ValidationIssue,
    };
    use crate::processing::Language;

    fn request() -> SummaryRequest {
        SummaryRequest {
            role: Role::Researcher,
            goal: "方法论".into(),
            level: SummaryLevel::Brief,
            focus_areas: Vec::new(),
            language: Language::ZhCn,
            max_length: 800,
        }
    }

    fn result(original_text: Option<String>) -> PipelineResult {
        PipelineResult {
            summary: StructuredSummary {
                title: "论文".into(),
                key_points: Vec::new(),
                risk_assessment: RiskAssessment::default(),
                narrative: "五个字正文".into(),
            },
            processing_meta: ProcessingMeta {
                pdf_type: SourceType::Text,
                page_count: 3,
                elapsed_ms: 12,
                ocr_used: false,
                chunk_count: 1,
                ai_model_used: "extractive".into(),
                output_path: None,
                stage_timings: Vec::new(),
                completed_at: "2025-01-01T00:00:00Z".into(),
            },
            original_text,
        }
    }

    #[test]
    fn success_envelope_has_data_only() {
        let response = ToolResponse::success(result(None), Path::new("/docs/a.pdf"), &request());
        let value = response.to_value();
        assert_eq!(value["success"], true);
        assert!(value.get("error").is_none());
        assert!(value["data"].get("originalText").is_none());
        assert_eq!(value["data"]["summary"]["userRole"], "researcher");
        assert_eq!(value["data"]["summary"]["summaryLevel"], "brief");
        assert_eq!(value["data"]["summary"]["wordCount"], 5);
        assert_eq!(value["data"]["processingInfo"]["originalPath"], "/docs/a.pdf");
        assert_eq!(value["data"]["processingInfo"]["pdfType"], "text");
        assert_eq!(value["data"]["processingInfo"]["ocrUsed"], false);
        assert!(value["data"]["processingInfo"].get("outputPath").is_none());
    }

    #[test]
    fn original_text_is_included_when_present() {
        let response = ToolResponse::success(
            result(Some("全文".into())),
            Path::new("/docs/a.pdf"),
            &request(),
        );
        assert_eq!(response.to_value()["data"]["originalText"], "全文");
    }

    #[test]
    fn validation_failure_lists_issues() {
        let failure = PipelineFailure::from(ValidationError::new(vec![ValidationIssue {
            field: "goal",
            message: "too long".into(),
            kind: IssueKind::Field,
        }]));
        let value = ToolResponse::failure(&failure).to_value();
        assert_eq!(value["success"], false);
        assert!(value.get("data").is_none());
        assert_eq!(value["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(value["error"]["details"]["issues"][0]["field"], "goal");
        assert!(value["error"]["details"]["stage"].is_null());
    }

    #[test]
    fn stage_failure_reports_stage_and_code() {
        let failure = PipelineFailure::at(PipelineStage::Preprocessing, PipelineError::EmptyContent);
        let response = ToolResponse::failure(&failure);
        assert_eq!(response.error_code(), Some(ErrorCode::Processing));
        let value = response.to_value();
        assert_eq!(value["error"]["details"]["stage"], "preprocessing");
        assert_eq!(value["error"]["code"], "PROCESSING_ERROR");
    }
}
