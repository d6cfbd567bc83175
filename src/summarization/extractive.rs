//! Deterministic summaries built from the document text alone.
//!
//! Key points are the leading sentences of each chunk, risk buckets are filled by keyword
//! matching, and the narrative stitches the opening chunks together under the role framing.
//! Output depends only on the input, which keeps the offline path reproducible.

use super::{SummarizationClient, SummarizationClientError, SummarizationInput};
use crate::processing::{
    Importance, KeyPoint, Language, RiskAssessment, StructuredSummary, SummaryLevel, TextChunk,
};
use async_trait::async_trait;

const HIGH_RISK_TERMS: &[&str] = &[
    "违约", "赔偿", "处罚", "罚款", "诉讼", "违法", "刑事", "解除", "breach", "penalty",
    "liability", "lawsuit", "damages", "terminate", "illegal",
];
const MEDIUM_RISK_TERMS: &[&str] = &[
    "风险", "延期", "争议", "变更", "不确定", "逾期", "risk", "delay", "dispute", "amend",
    "uncertain", "overdue",
];
const MAX_RISKS_PER_BUCKET: usize = 5;
const MAX_POINT_CHARS: usize = 160;

/// Offline provider that never fails on well-formed input.
#[derive(Debug, Default, Clone, Copy)]
pub struct ExtractiveSummarizationClient;

impl ExtractiveSummarizationClient {
    /// Construct the provider.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SummarizationClient for ExtractiveSummarizationClient {
    async fn summarize(
        &self,
        input: &SummarizationInput,
    ) -> Result<StructuredSummary, SummarizationClientError> {
        if input.chunks.is_empty() {
            return Err(SummarizationClientError::GenerationFailed(
                "no document text to summarize".into(),
            ));
        }
        let language = input.request.language;
        let sentences = collect_sentences(&input.chunks);

        Ok(StructuredSummary {
            title: match language {
                Language::ZhCn => "文档智能总结".into(),
                Language::EnUs => "Document Summary".into(),
            },
            key_points: key_points(input, language),
            risk_assessment: risk_assessment(&sentences, language),
            narrative: narrative(input, language),
        })
    }

    fn model_label(&self) -> String {
        "extractive".into()
    }
}

fn point_budget(level: SummaryLevel) -> usize {
    match level {
        SummaryLevel::Brief => 3,
        SummaryLevel::Standard => 5,
        SummaryLevel::Detailed => 8,
    }
}

fn key_points(input: &SummarizationInput, language: Language) -> Vec<KeyPoint> {
    let focus: Vec<&str> = input
        .request
        .focus_areas
        .iter()
        .map(|area| area.trim())
        .filter(|area| !area.is_empty())
        .collect();
    let default_category = match language {
        Language::ZhCn => "核心内容",
        Language::EnUs => "Key content",
    };

    let mut points = Vec::new();
    for chunk in &input.chunks {
        if points.len() >= point_budget(input.request.level) {
            break;
        }
        let Some(sentence) = split_sentences(&chunk.content).next() else {
            continue;
        };
        let matched_focus = focus.iter().find(|area| chunk.content.contains(**area));
        let importance = if contains_any(&chunk.content, HIGH_RISK_TERMS) || matched_focus.is_some()
        {
            Importance::High
        } else if points.is_empty() {
            Importance::Medium
        } else {
            Importance::Low
        };
        points.push(KeyPoint {
            category: matched_focus
                .map(|area| (*area).to_string())
                .unwrap_or_else(|| default_category.to_string()),
            content: clip(sentence, MAX_POINT_CHARS),
            importance,
            page_references: Vec::new(),
        });
    }
    points
}

fn risk_assessment(sentences: &[&str], language: Language) -> RiskAssessment {
    let mut assessment = RiskAssessment::default();
    for sentence in sentences {
        if contains_any(sentence, HIGH_RISK_TERMS) {
            if assessment.high_risk.len() < MAX_RISKS_PER_BUCKET {
                assessment.high_risk.push(clip(sentence, MAX_POINT_CHARS));
            }
        } else if contains_any(sentence, MEDIUM_RISK_TERMS)
            && assessment.medium_risk.len() < MAX_RISKS_PER_BUCKET
        {
            assessment.medium_risk.push(clip(sentence, MAX_POINT_CHARS));
        }
    }

    let (review_high, review_medium) = match language {
        Language::ZhCn => (
            "优先核查高风险条款，评估潜在法律与经济后果",
            "持续跟踪中等风险事项，必要时补充约定",
        ),
        Language::EnUs => (
            "Review the high-risk clauses first and assess their legal and financial impact",
            "Track the medium-risk items and clarify them where needed",
        ),
    };
    if !assessment.high_risk.is_empty() {
        assessment.recommendations.push(review_high.to_string());
    }
    if !assessment.medium_risk.is_empty() {
        assessment.recommendations.push(review_medium.to_string());
    }
    assessment
}

fn narrative(input: &SummarizationInput, language: Language) -> String {
    let goal = input.request.goal.trim();
    let lead = match language {
        Language::ZhCn => format!(
            "基于{}角色的视角（{}），针对“{}”的需求，文档主要内容包括：",
            input.request.role, input.framing, goal
        ),
        Language::EnUs => format!(
            "From the {} perspective ({}), addressing \"{}\", the document covers: ",
            input.request.role, input.framing, goal
        ),
    };
    let body = input
        .chunks
        .iter()
        .take(2)
        .map(|chunk| chunk.content.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");
    format!("{lead}\n\n{body}")
}

fn collect_sentences(chunks: &[TextChunk]) -> Vec<&str> {
    chunks
        .iter()
        .flat_map(|chunk| split_sentences(&chunk.content))
        .collect()
}

fn split_sentences(text: &str) -> impl Iterator<Item = &str> {
    text.split(['。', '！', '？', '.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| !sentence.is_empty())
}

fn contains_any(text: &str, terms: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    terms.iter().any(|term| lowered.contains(term))
}

fn clip(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut clipped: String = text.chars().take(max_chars - 1).collect();
    clipped.push('…');
    clipped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{Role, SummaryRequest};

    fn input(chunks: &[&str], level: SummaryLevel, focus: &[&str]) -> SummarizationInput {
        SummarizationInput {
            request: SummaryRequest {
                role: Role::Lawyer,
                goal: "识别合同风险".into(),
                level,
                focus_areas: focus.iter().map(|s| s.to_string()).collect(),
                language: Language::ZhCn,
                max_length: 2000,
            },
            framing: "重点关注法律条款".into(),
            chunks: chunks
                .iter()
                .enumerate()
                .map(|(index, content)| TextChunk {
                    index,
                    content: content.to_string(),
                    approx_length: content.chars().count(),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn buckets_sentences_by_keyword() {
        let summary = ExtractiveSummarizationClient::new()
            .summarize(&input(
                &["甲方逾期付款应承担违约责任。交付可能延期。双方友好协商。"],
                SummaryLevel::Detailed,
                &[],
            ))
            .await
            .expect("summary");

        assert_eq!(summary.risk_assessment.high_risk, vec!["甲方逾期付款应承担违约责任"]);
        assert_eq!(summary.risk_assessment.medium_risk, vec!["交付可能延期"]);
        assert_eq!(summary.risk_assessment.recommendations.len(), 2);
        assert_eq!(summary.title, "文档智能总结");
        assert!(summary.narrative.contains("识别合同风险"));
    }

    #[tokio::test]
    async fn level_bounds_key_points_and_focus_sets_category() {
        let chunks = ["第一部分。", "付款条款约定。", "第三部分。", "第四部分。", "第五部分。"];
        let summary = ExtractiveSummarizationClient::new()
            .summarize(&input(&chunks, SummaryLevel::Brief, &["付款条款"]))
            .await
            .expect("summary");

        assert_eq!(summary.key_points.len(), 3);
        assert_eq!(summary.key_points[1].category, "付款条款");
        assert_eq!(summary.key_points[1].importance, Importance::High);
        assert_eq!(summary.key_points[0].category, "核心内容");
    }

    #[tokio::test]
    async fn output_is_deterministic() {
        let request = input(&["Clause one. Clause two!"], SummaryLevel::Standard, &[]);
        let client = ExtractiveSummarizationClient::new();
        let first = client.summarize(&request).await.expect("first");
        let second = client.summarize(&request).await.expect("second");
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn empty_input_is_rejected() {
        let error = ExtractiveSummarizationClient::new()
            .summarize(&input(&[], SummaryLevel::Brief, &[]))
            .await
            .expect_err("no chunks");
        assert!(matches!(error, SummarizationClientError::GenerationFailed(_)));
    }
}
