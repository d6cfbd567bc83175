//! Prompt assembly for model-backed summarization.
//!
//! Chunks are packed in document order until the token budget is spent. Token counting uses
//! `tiktoken-rs` (`cl100k_base`); local models rarely share that vocabulary, so the count is an
//! estimate and a fixed reserve is kept for the model's answer.

use super::SummarizationInput;
use crate::processing::{Language, SummaryLevel};
use std::sync::Arc;
use tiktoken_rs::cl100k_base;

type TokenCounter = Arc<dyn Fn(&str) -> usize + Send + Sync>;

/// Tokens held back for the model's JSON answer.
const RESPONSE_RESERVE: usize = 1024;

/// Token counter plus the budget a prompt may use.
#[derive(Clone)]
pub(crate) struct PromptBudget {
    counter: TokenCounter,
    max_prompt_tokens: usize,
}

impl PromptBudget {
    /// Budget for a model with a `context_tokens` window.
    pub(crate) fn new(context_tokens: usize) -> Self {
        Self {
            counter: build_token_counter(),
            max_prompt_tokens: context_tokens.saturating_sub(RESPONSE_RESERVE).max(256),
        }
    }

    fn count(&self, text: &str) -> usize {
        (self.counter)(text)
    }
}

fn build_token_counter() -> TokenCounter {
    match cl100k_base() {
        Ok(encoding) => {
            let encoding = Arc::new(encoding);
            Arc::new(move |segment: &str| encoding.encode_ordinary(segment).len())
        }
        Err(error) => {
            tracing::warn!(error = %error, "Tokenizer unavailable; estimating tokens from characters");
            Arc::new(|segment: &str| segment.chars().count().div_ceil(2))
        }
    }
}

/// Assembled prompt and how much of the document made it in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct BuiltPrompt {
    pub(crate) text: String,
    pub(crate) chunks_included: usize,
}

/// Build the JSON-mode prompt for `input` within `budget`.
pub(crate) fn build_prompt(input: &SummarizationInput, budget: &PromptBudget) -> BuiltPrompt {
    let request = &input.request;
    let mut prompt = String::new();
    prompt.push_str(&instructions(request.language, request.level, request.max_length));
    prompt.push_str(&format!("\n\nRole: {} ({})\n", request.role, input.framing));
    prompt.push_str(&format!("Goal: {}\n", request.goal.trim()));
    if !request.focus_areas.is_empty() {
        prompt.push_str(&format!("Focus areas: {}\n", request.focus_areas.join(", ")));
    }
    prompt.push_str("\nDocument:\n");

    let mut used = budget.count(&prompt);
    let mut chunks_included = 0usize;
    for chunk in &input.chunks {
        let section = format!("[Section {}]\n{}\n\n", chunk.index + 1, chunk.content);
        let cost = budget.count(&section);
        if used + cost > budget.max_prompt_tokens {
            if chunks_included == 0 {
                let remaining = budget.max_prompt_tokens.saturating_sub(used);
                let truncated = fit_section(chunk.index, &chunk.content, remaining, budget);
                tracing::warn!(
                    section = chunk.index + 1,
                    chars = chunk.content.chars().count(),
                    kept_chars = truncated.chars().count(),
                    "First section exceeds the prompt budget; truncating it"
                );
                prompt.push_str(&truncated);
                chunks_included = 1;
            }
            break;
        }
        used += cost;
        chunks_included += 1;
        prompt.push_str(&section);
    }

    if chunks_included < input.chunks.len() {
        tracing::info!(
            included = chunks_included,
            total = input.chunks.len(),
            "Prompt budget exhausted; later sections omitted"
        );
    }

    BuiltPrompt {
        text: prompt,
        chunks_included,
    }
}

/// Longest prefix of `content` whose section fits in `remaining` tokens.
fn fit_section(index: usize, content: &str, remaining: usize, budget: &PromptBudget) -> String {
    let boundaries: Vec<usize> = content
        .char_indices()
        .map(|(offset, _)| offset)
        .chain(std::iter::once(content.len()))
        .collect();
    let render = |end: usize| format!("[Section {}]\n{}\n\n", index + 1, &content[..end]);

    // Largest prefix length (in chars) that still fits.
    let (mut low, mut high) = (0usize, boundaries.len() - 1);
    while low < high {
        let mid = (low + high).div_ceil(2);
        if budget.count(&render(boundaries[mid])) <= remaining {
            low = mid;
        } else {
            high = mid - 1;
        }
    }
    render(boundaries[low])
}

fn instructions(language: Language, level: SummaryLevel, max_length: usize) -> String {
    let language_hint = match language {
        Language::ZhCn => "Write every string value in Simplified Chinese.",
        Language::EnUs => "Write every string value in English.",
    };
    let depth = match level {
        SummaryLevel::Brief => "Give at most 3 key points.",
        SummaryLevel::Standard => "Give 3 to 6 key points.",
        SummaryLevel::Detailed => "Give up to 10 key points covering every important section.",
    };
    format!(
        "System: You analyse documents for a specific reader and answer with a single JSON object \
         of the form {{\"title\": string, \"keyPoints\": [{{\"category\": string, \"content\": \
         string, \"importance\": \"high\"|\"medium\"|\"low\", \"pageReferences\": [number]}}], \
         \"riskAssessment\": {{\"highRisk\": [string], \"mediumRisk\": [string], \
         \"recommendations\": [string]}}, \"summary\": string}}. {depth} Keep \"summary\" under \
         {max_length} characters. {language_hint} Do not invent facts that are not in the document."
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::{Role, SummaryRequest, TextChunk};

    fn input(chunks: usize, chunk_len: usize) -> SummarizationInput {
        SummarizationInput {
            request: SummaryRequest {
                role: Role::Lawyer,
                goal: "找出违约责任".into(),
                level: SummaryLevel::Standard,
                focus_areas: vec!["违约条款".into()],
                language: Language::ZhCn,
                max_length: 800,
            },
            framing: "法律视角".into(),
            chunks: (0..chunks)
                .map(|index| TextChunk {
                    index,
                    content: "word ".repeat(chunk_len),
                    approx_length: chunk_len * 5,
                })
                .collect(),
        }
    }

    #[test]
    fn includes_request_context() {
        let built = build_prompt(&input(1, 10), &PromptBudget::new(8192));
        assert_eq!(built.chunks_included, 1);
        assert!(built.text.contains("Goal: 找出违约责任"));
        assert!(built.text.contains("Focus areas: 违约条款"));
        assert!(built.text.contains("[Section 1]"));
        assert!(built.text.contains("Simplified Chinese"));
    }

    #[test]
    fn stops_packing_when_budget_is_spent() {
        let built = build_prompt(&input(20, 400), &PromptBudget::new(2048));
        assert!(built.chunks_included < 20);
        assert!(built.chunks_included >= 1);
        assert!(!built.text.contains(&format!("[Section {}]", built.chunks_included + 1)));
    }

    #[test]
    fn oversized_first_section_is_truncated_to_fit() {
        let mut oversized = input(1, 1);
        oversized.chunks[0].content = "合同约定违约金按日计算".repeat(2000);
        let budget = PromptBudget::new(8192);

        let built = build_prompt(&oversized, &budget);

        assert_eq!(built.chunks_included, 1);
        assert!(built.text.contains("[Section 1]\n合同约定"));
        // Tokens may merge across the header boundary.
        assert!(budget.count(&built.text) <= budget.max_prompt_tokens + 4);
        assert!(built.text.len() < oversized.chunks[0].content.len());
    }
}
