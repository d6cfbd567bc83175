//! Rendering of structured summaries as Markdown, JSON or plain text, plus persistence of the
//! rendered output next to the source document.
//!
//! Every variant carries the key points, all three risk buckets and the narrative. The original
//! text, when included, is capped and followed by a truncation notice if it was cut.

use super::types::{Language, OutputFormat, StructuredSummary};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Default cap on original text included in rendered output, in characters.
pub const DEFAULT_ORIGINAL_CAP: usize = 5000;

/// Suffix inserted between the document stem and the output extension.
pub const OUTPUT_SUFFIX: &str = "_智能总结";

/// Errors raised while rendering or persisting output.
#[derive(Debug, Error)]
pub enum FormatError {
    /// The summary could not be serialized.
    #[error("failed to serialize summary: {0}")]
    Serialize(#[source] serde_json::Error),
    /// Rendered JSON could not be read back.
    #[error("failed to parse rendered summary: {0}")]
    Parse(#[source] serde_json::Error),
    /// The output file could not be written.
    #[error("failed to write {path}: {source}")]
    Write {
        /// Destination path.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct JsonDocument<'a> {
    summary: &'a StructuredSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    original_text: Option<String>,
}

#[derive(Deserialize)]
struct ParsedDocument {
    summary: StructuredSummary,
}

struct Labels {
    key_points: &'static str,
    importance: &'static str,
    page_refs: &'static str,
    risk: &'static str,
    high_risk: &'static str,
    medium_risk: &'static str,
    recommendations: &'static str,
    narrative: &'static str,
    original: &'static str,
    truncated: &'static str,
}

const LABELS_ZH: Labels = Labels {
    key_points: "关键要点",
    importance: "重要性",
    page_refs: "页面参考",
    risk: "风险评估",
    high_risk: "高风险点",
    medium_risk: "中等风险点",
    recommendations: "建议",
    narrative: "总结",
    original: "原文内容",
    truncated: "... (内容过长，已截断)",
};

const LABELS_EN: Labels = Labels {
    key_points: "Key Points",
    importance: "Importance",
    page_refs: "Page references",
    risk: "Risk Assessment",
    high_risk: "High Risk",
    medium_risk: "Medium Risk",
    recommendations: "Recommendations",
    narrative: "Summary",
    original: "Original Text",
    truncated: "... (content too long, truncated)",
};

/// Pure renderer for [`StructuredSummary`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultFormatter {
    language: Language,
    original_cap: usize,
}

impl ResultFormatter {
    /// Formatter producing labels in `language`, capping original text at 5000 characters.
    pub fn new(language: Language) -> Self {
        Self {
            language,
            original_cap: DEFAULT_ORIGINAL_CAP,
        }
    }

    /// Override the original-text cap.
    pub fn with_original_cap(mut self, cap: usize) -> Self {
        self.original_cap = cap;
        self
    }

    fn labels(&self) -> &'static Labels {
        match self.language {
            Language::ZhCn => &LABELS_ZH,
            Language::EnUs => &LABELS_EN,
        }
    }

    /// Render `summary` in `format`, appending capped `original_text` when `include_original`.
    pub fn format(
        &self,
        summary: &StructuredSummary,
        original_text: &str,
        format: OutputFormat,
        include_original: bool,
    ) -> Result<String, FormatError> {
        let original = (include_original && !original_text.is_empty())
            .then(|| self.cap_original(original_text));
        match format {
            OutputFormat::Markdown => Ok(self.markdown(summary, original.as_deref())),
            OutputFormat::Text => Ok(self.plain_text(summary, original.as_deref())),
            OutputFormat::Json => serde_json::to_string_pretty(&JsonDocument {
                summary,
                original_text: original,
            })
            .map_err(FormatError::Serialize),
        }
    }

    /// Keep at most the configured number of characters, adding a notice when text was cut.
    pub fn cap_original(&self, text: &str) -> String {
        if text.chars().count() <= self.original_cap {
            return text.to_string();
        }
        let mut capped: String = text.chars().take(self.original_cap).collect();
        capped.push_str("\n\n");
        capped.push_str(self.labels().truncated);
        capped
    }

    fn markdown(&self, summary: &StructuredSummary, original: Option<&str>) -> String {
        let labels = self.labels();
        let mut out = String::new();
        let _ = write!(out, "# {}\n\n", summary.title);

        let _ = write!(out, "## 📋 {}\n\n", labels.key_points);
        for point in &summary.key_points {
            let _ = write!(out, "### {}\n\n", point.category);
            let _ = write!(out, "**{}**: {}\n\n", labels.importance, point.importance.as_str());
            let _ = write!(out, "{}\n\n", point.content);
            if !point.page_references.is_empty() {
                let _ = write!(
                    out,
                    "**{}**: {}\n\n",
                    labels.page_refs,
                    join_pages(&point.page_references)
                );
            }
        }

        let risk = &summary.risk_assessment;
        if !risk.is_empty() {
            let _ = write!(out, "## ⚠️ {}\n\n", labels.risk);
            for (icon, label, items) in [
                ("🔴", labels.high_risk, &risk.high_risk),
                ("🟡", labels.medium_risk, &risk.medium_risk),
                ("💡", labels.recommendations, &risk.recommendations),
            ] {
                if items.is_empty() {
                    continue;
                }
                let _ = write!(out, "### {icon} {label}\n\n");
                for item in items {
                    let _ = writeln!(out, "- {item}");
                }
                out.push('\n');
            }
        }

        let _ = write!(out, "## 📝 {}\n\n{}\n\n", labels.narrative, summary.narrative);

        if let Some(original) = original {
            let _ = write!(out, "## 📄 {}\n\n```\n{original}\n```\n", labels.original);
        }
        out
    }

    fn plain_text(&self, summary: &StructuredSummary, original: Option<&str>) -> String {
        let labels = self.labels();
        let mut out = String::new();
        let _ = write!(out, "{}\n{}\n\n", summary.title, "=".repeat(50));

        let _ = writeln!(out, "{}:", labels.key_points);
        for point in &summary.key_points {
            let _ = write!(
                out,
                "\n{} ({})\n{}\n",
                point.category,
                point.importance.as_str(),
                point.content
            );
            if !point.page_references.is_empty() {
                let _ = writeln!(
                    out,
                    "{}: {}",
                    labels.page_refs,
                    join_pages(&point.page_references)
                );
            }
        }

        let risk = &summary.risk_assessment;
        if !risk.is_empty() {
            let _ = write!(out, "\n{}:\n", labels.risk);
            for (label, items) in [
                (labels.high_risk, &risk.high_risk),
                (labels.medium_risk, &risk.medium_risk),
                (labels.recommendations, &risk.recommendations),
            ] {
                if items.is_empty() {
                    continue;
                }
                let _ = write!(out, "\n{label}:\n");
                for item in items {
                    let _ = writeln!(out, "- {item}");
                }
            }
        }

        let _ = write!(out, "\n{}:\n{}\n", labels.narrative, summary.narrative);

        if let Some(original) = original {
            let _ = write!(out, "\n{}:\n{}\n{original}\n", labels.original, "-".repeat(50));
        }
        out
    }
}

fn join_pages(pages: &[u32]) -> String {
    pages
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Read a JSON rendering back into the summary it was produced from.
pub fn parse_json(rendered: &str) -> Result<StructuredSummary, FormatError> {
    serde_json::from_str::<ParsedDocument>(rendered)
        .map(|document| document.summary)
        .map_err(FormatError::Parse)
}

/// Sibling path `{stem}_智能总结{ext}` for the rendered output of `document_path`.
pub fn output_path(document_path: &Path, format: OutputFormat) -> PathBuf {
    let stem = document_path
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".into());
    let file_name = format!("{stem}{OUTPUT_SUFFIX}{}", format.extension());
    match document_path.parent() {
        Some(parent) => parent.join(file_name),
        None => PathBuf::from(file_name),
    }
}

/// Write `content` to `path`, replacing any previous output.
pub async fn persist(path: &Path, content: &str) -> Result<(), FormatError> {
    tokio::fs::write(path, content)
        .await
        .map_err(|source| FormatError::Write {
            path: path.display().to_string(),
            source,
        })
}
