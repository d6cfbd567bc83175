//! Caller-facing request parsing and validation.
//!
//! Requests arrive as loosely typed JSON. Every field is checked and all problems are reported
//! together; nothing touches the document's contents until validation succeeds.

use super::types::{
    Document, IssueKind, Language, OcrLanguage, OutputFormat, Role, SummaryLevel, SummaryRequest,
    ValidationError, ValidationIssue,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::Path;

/// Longest accepted goal, in characters.
pub const MAX_GOAL_CHARS: usize = 500;
/// Longest accepted focus area, in characters.
pub const MAX_FOCUS_AREA_CHARS: usize = 50;
/// Accepted narrative bounds, in characters.
pub const SUMMARY_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 500..=10_000;
/// Narrative bound applied when the caller does not set one.
pub const DEFAULT_SUMMARY_LENGTH: usize = 2000;

/// Raw request as received over HTTP, MCP or the CLI.
///
/// Field names are camelCase; the older names `pdfPath`, `userRole`, `summaryRequest`,
/// `summaryLevel` and `enableOCR` are accepted as aliases.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummarizeParams {
    /// Path of the PDF to summarize.
    #[serde(default, alias = "pdfPath")]
    pub document_path: Option<String>,
    /// Reader role.
    #[serde(default, alias = "userRole")]
    pub role: Option<String>,
    /// What the reader wants from the document.
    #[serde(default, alias = "summaryRequest")]
    pub goal: Option<String>,
    /// `brief`, `standard` or `detailed`.
    #[serde(default, alias = "summaryLevel")]
    pub level: Option<String>,
    /// Sections or topics to emphasize.
    #[serde(default)]
    pub focus_areas: Option<Vec<String>>,
    /// `markdown`, `json` or `text`.
    #[serde(default)]
    pub output_format: Option<String>,
    /// `zh-CN` or `en-US`.
    #[serde(default)]
    pub language: Option<String>,
    /// Return and render the extracted text.
    #[serde(default)]
    pub include_original_text: Option<bool>,
    /// Narrative bound in characters.
    #[serde(default)]
    pub max_summary_length: Option<usize>,
    /// Allow the OCR fallback.
    #[serde(default, alias = "enableOCR")]
    pub enable_ocr: Option<bool>,
    /// `chi_sim`, `eng` or `chi_sim+eng`.
    #[serde(default)]
    pub ocr_language: Option<String>,
}

/// A request that passed validation, ready to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedRequest {
    /// Document to process.
    pub document: Document,
    /// Summarizer intent.
    pub summary: SummaryRequest,
    /// Rendering target.
    pub output_format: OutputFormat,
    /// Whether the extracted text is returned and rendered.
    pub include_original_text: bool,
    /// Whether OCR may run.
    pub enable_ocr: bool,
    /// Recognizer language.
    pub ocr_language: OcrLanguage,
}

/// Limits enforced during validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationLimits {
    /// Largest accepted document in bytes.
    pub max_document_bytes: u64,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self {
            max_document_bytes: 50 * 1024 * 1024,
        }
    }
}

/// Parse a JSON request and validate it.
pub async fn validate_value(
    value: serde_json::Value,
    limits: ValidationLimits,
) -> Result<ValidatedRequest, ValidationError> {
    let params: SummarizeParams = serde_json::from_value(value).map_err(|error| {
        ValidationError::new(vec![ValidationIssue {
            field: "request",
            message: format!("malformed request: {error}"),
            kind: IssueKind::Field,
        }])
    })?;
    validate(params, limits).await
}

/// Validate `params`, statting the referenced document.
pub async fn validate(
    params: SummarizeParams,
    limits: ValidationLimits,
) -> Result<ValidatedRequest, ValidationError> {
    let mut issues = Vec::new();
    let mut field_issue = |field: &'static str, message: String| {
        issues.push(ValidationIssue {
            field,
            message,
            kind: IssueKind::Field,
        })
    };

    let role = match sanitize_string(params.role) {
        Some(role) => Some(Role::parse(&role)),
        None => {
            field_issue("role", "role is required".into());
            None
        }
    };

    let goal = sanitize_string(params.goal);
    match &goal {
        None => field_issue("goal", "goal is required".into()),
        Some(goal) if goal.chars().count() > MAX_GOAL_CHARS => field_issue(
            "goal",
            format!("goal must be at most {MAX_GOAL_CHARS} characters"),
        ),
        Some(_) => {}
    }

    let focus_areas: Vec<String> = params
        .focus_areas
        .unwrap_or_default()
        .into_iter()
        .filter_map(|area| sanitize_string(Some(area)))
        .collect();
    if let Some(area) = focus_areas
        .iter()
        .find(|area| area.chars().count() > MAX_FOCUS_AREA_CHARS)
    {
        field_issue(
            "focusAreas",
            format!("focus area '{area}' exceeds {MAX_FOCUS_AREA_CHARS} characters"),
        );
    }

    let max_length = params.max_summary_length.unwrap_or(DEFAULT_SUMMARY_LENGTH);
    if !SUMMARY_LENGTH_RANGE.contains(&max_length) {
        field_issue(
            "maxSummaryLength",
            format!(
                "maxSummaryLength must be between {} and {}",
                SUMMARY_LENGTH_RANGE.start(),
                SUMMARY_LENGTH_RANGE.end()
            ),
        );
    }

    let level = parse_choice::<SummaryLevel>(params.level, "level", &mut field_issue);
    let output_format =
        parse_choice::<OutputFormat>(params.output_format, "outputFormat", &mut field_issue);
    let language = parse_choice::<Language>(params.language, "language", &mut field_issue);
    let ocr_language =
        parse_choice::<OcrLanguage>(params.ocr_language, "ocrLanguage", &mut field_issue);

    let document_path = sanitize_string(params.document_path);
    if document_path.is_none() {
        field_issue("documentPath", "documentPath is required".into());
    }
    let document = match document_path {
        None => None,
        Some(path) => match check_document(Path::new(&path), limits).await {
            Ok(document) => Some(document),
            Err(message) => {
                issues.push(ValidationIssue {
                    field: "documentPath",
                    message,
                    kind: IssueKind::File,
                });
                None
            }
        },
    };

    match (document, role, goal, level, output_format, language, ocr_language) {
        (
            Some(document),
            Some(role),
            Some(goal),
            Some(level),
            Some(output_format),
            Some(language),
            Some(ocr_language),
        ) if issues.is_empty() => Ok(ValidatedRequest {
            document,
            summary: SummaryRequest {
                role,
                goal,
                level,
                focus_areas,
                language,
                max_length,
            },
            output_format,
            include_original_text: params.include_original_text.unwrap_or(true),
            enable_ocr: params.enable_ocr.unwrap_or(true),
            ocr_language,
        }),
        _ => Err(ValidationError::new(issues)),
    }
}

async fn check_document(path: &Path, limits: ValidationLimits) -> Result<Document, String> {
    let is_pdf = path
        .extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"));
    if !is_pdf {
        return Err(format!("{} is not a .pdf file", path.display()));
    }
    let metadata = tokio::fs::metadata(path)
        .await
        .map_err(|error| format!("file not found or unreadable: {} ({error})", path.display()))?;
    if !metadata.is_file() {
        return Err(format!("{} is not a regular file", path.display()));
    }
    let document = Document::new(path, metadata.len(), metadata.modified().ok());
    if document.byte_size() > limits.max_document_bytes {
        return Err(format!(
            "file is {} bytes, larger than the {} byte limit",
            document.byte_size(),
            limits.max_document_bytes
        ));
    }
    Ok(document)
}

/// Parse an optional enum field through its serde names, falling back to the default.
fn parse_choice<T>(
    value: Option<String>,
    field: &'static str,
    report: &mut impl FnMut(&'static str, String),
) -> Option<T>
where
    T: DeserializeOwned + Default,
{
    match sanitize_string(value) {
        None => Some(T::default()),
        Some(raw) => match serde_json::from_value(serde_json::Value::String(raw.clone())) {
            Ok(parsed) => Some(parsed),
            Err(_) => {
                report(field, format!("unsupported value '{raw}'"));
                None
            }
        },
    }
}

/// Trim whitespace and drop empty values.
pub(crate) fn sanitize_string(value: Option<String>) -> Option<String> {
    value.and_then(|input| {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::ErrorCode;
    use serde_json::json;

    fn pdf_fixture(bytes: usize) -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("合同.pdf");
        std::fs::write(&path, vec![b'%'; bytes]).expect("write");
        let path = path.display().to_string();
        (dir, path)
    }

    #[tokio::test]
    async fn applies_defaults_and_aliases() {
        let (_dir, path) = pdf_fixture(16);
        let request = validate_value(
            json!({"pdfPath": path, "userRole": "lawyer", "summaryRequest": "找出风险"}),
            ValidationLimits::default(),
        )
        .await
        .expect("valid");

        assert_eq!(request.summary.role, Role::Lawyer);
        assert_eq!(request.summary.level, SummaryLevel::Detailed);
        assert_eq!(request.summary.language, Language::ZhCn);
        assert_eq!(request.summary.max_length, 2000);
        assert_eq!(request.output_format, OutputFormat::Markdown);
        assert_eq!(request.ocr_language, OcrLanguage::ChiSim);
        assert!(request.include_original_text);
        assert!(request.enable_ocr);
        assert_eq!(request.document.byte_size(), 16);
    }

    #[tokio::test]
    async fn goal_over_limit_is_rejected() {
        let (_dir, path) = pdf_fixture(16);
        let error = validate_value(
            json!({"documentPath": path, "role": "lawyer", "goal": "a".repeat(501)}),
            ValidationLimits::default(),
        )
        .await
        .expect_err("too long");
        assert_eq!(error.code(), ErrorCode::Validation);
        assert_eq!(error.issues()[0].field, "goal");
    }

    #[tokio::test]
    async fn goal_of_exactly_limit_is_accepted() {
        let (_dir, path) = pdf_fixture(16);
        let request = validate_value(
            json!({"documentPath": path, "role": "lawyer", "goal": "案".repeat(500)}),
            ValidationLimits::default(),
        )
        .await;
        assert!(request.is_ok());
    }

    #[tokio::test]
    async fn collects_every_field_issue() {
        let error = validate_value(
            json!({
                "role": " ",
                "goal": "",
                "focusAreas": ["x".repeat(51)],
                "level": "exhaustive",
                "outputFormat": "docx",
                "maxSummaryLength": 100,
                "ocrLanguage": "fra"
            }),
            ValidationLimits::default(),
        )
        .await
        .expect_err("invalid");

        let fields: Vec<&str> = error.issues().iter().map(|issue| issue.field).collect();
        for field in [
            "role",
            "goal",
            "focusAreas",
            "maxSummaryLength",
            "level",
            "outputFormat",
            "ocrLanguage",
            "documentPath",
        ] {
            assert!(fields.contains(&field), "missing issue for {field}");
        }
        assert_eq!(error.code(), ErrorCode::Validation);
    }

    #[tokio::test]
    async fn missing_file_is_a_file_error() {
        let error = validate_value(
            json!({"documentPath": "/nonexistent/案卷.pdf", "role": "lawyer", "goal": "概述"}),
            ValidationLimits::default(),
        )
        .await
        .expect_err("missing");
        assert_eq!(error.code(), ErrorCode::File);
    }

    #[tokio::test]
    async fn wrong_extension_and_oversize_are_file_errors() {
        let error = validate_value(
            json!({"documentPath": "/tmp/notes.docx", "role": "lawyer", "goal": "概述"}),
            ValidationLimits::default(),
        )
        .await
        .expect_err("not pdf");
        assert_eq!(error.code(), ErrorCode::File);

        let (_dir, path) = pdf_fixture(2048);
        let error = validate_value(
            json!({"documentPath": path, "role": "lawyer", "goal": "概述"}),
            ValidationLimits {
                max_document_bytes: 1024,
            },
        )
        .await
        .expect_err("too big");
        assert_eq!(error.code(), ErrorCode::File);
    }

    #[tokio::test]
    async fn uppercase_extension_is_accepted() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("SCAN.PDF");
        std::fs::write(&path, b"%PDF").expect("write");
        let request = validate_value(
            json!({"documentPath": path.display().to_string(), "role": "student", "goal": "学习"}),
            ValidationLimits::default(),
        )
        .await;
        assert!(request.is_ok());
    }

    #[tokio::test]
    async fn non_object_request_is_a_validation_error() {
        let error = validate_value(json!("just a string"), ValidationLimits::default())
            .await
            .expect_err("malformed");
        assert_eq!(error.code(), ErrorCode::Validation);
        assert_eq!(error.issues()[0].field, "request");
    }
}
