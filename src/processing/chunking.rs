//! Sentence-aligned chunking of normalized text.
//!
//! Text is split on the terminator set `。！？.!?`. Terminators are consumed and every sentence is
//! re-suffixed with `。` when appended, so chunk text always uses the CJK full stop regardless of
//! the original punctuation. Sentences are packed greedily: a chunk grows while its length plus
//! the next sentence stays within the limit. A sentence longer than the limit is emitted alone
//! as one oversized chunk; nothing is dropped or cut mid-sentence.
//!
//! Lengths are counted in characters, not bytes or tokens.

use super::types::{ChunkingError, TextChunk};

/// Suffix appended to every sentence.
pub const SENTENCE_SUFFIX: char = '。';

const TERMINATORS: [char; 6] = ['。', '！', '？', '.', '!', '?'];

/// Greedy sentence packer with a fixed character limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    max_chars: usize,
}

impl Chunker {
    /// Build a chunker that keeps chunks within `max_chars` characters.
    pub fn new(max_chars: usize) -> Result<Self, ChunkingError> {
        if max_chars == 0 {
            return Err(ChunkingError::InvalidChunkSize);
        }
        Ok(Self { max_chars })
    }

    /// Configured limit.
    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    /// Split `text` into ordered chunks. Whitespace-only input yields no chunks.
    pub fn chunk(&self, text: &str) -> Vec<TextChunk> {
        let mut chunks = Vec::new();
        let mut current = String::new();
        let mut current_len = 0usize;

        for sentence in text.split(TERMINATORS) {
            if sentence.trim().is_empty() {
                continue;
            }
            let sentence_len = sentence.chars().count() + 1;
            if current_len + sentence_len > self.max_chars {
                push_chunk(&mut chunks, &current);
                current.clear();
                current_len = 0;
            }
            current.push_str(sentence);
            current.push(SENTENCE_SUFFIX);
            current_len += sentence_len;
        }
        push_chunk(&mut chunks, &current);

        chunks
    }
}

fn push_chunk(chunks: &mut Vec<TextChunk>, content: &str) {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return;
    }
    chunks.push(TextChunk {
        index: chunks.len(),
        content: trimmed.to_string(),
        approx_length: trimmed.chars().count(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentences_of(text: &str) -> Vec<String> {
        text.split(TERMINATORS)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn rejects_zero_limit() {
        assert!(matches!(Chunker::new(0), Err(ChunkingError::InvalidChunkSize)));
    }

    #[test]
    fn whitespace_input_has_no_chunks() {
        let chunker = Chunker::new(10).expect("chunker");
        assert!(chunker.chunk("").is_empty());
        assert!(chunker.chunk("  . ! ").is_empty());
    }

    #[test]
    fn packs_sentences_greedily_and_normalizes_terminators() {
        let chunker = Chunker::new(8).expect("chunker");
        let chunks = chunker.chunk("甲方付款。乙方交货！Ok?");
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["甲方付款。", "乙方交货。Ok。"]);
        assert_eq!(chunks[1].index, 1);
        assert_eq!(chunks[1].approx_length, 8);
    }

    #[test]
    fn oversized_sentence_stands_alone() {
        let chunker = Chunker::new(5).expect("chunker");
        let chunks = chunker.chunk("短句。这是一个非常长的句子。尾");
        let contents: Vec<&str> = chunks.iter().map(|c| c.content.as_str()).collect();
        assert_eq!(contents, vec!["短句。", "这是一个非常长的句子。", "尾。"]);
    }

    #[test]
    fn chunks_respect_limit_and_cover_every_sentence() {
        let text = "The tenant pays rent monthly. Late payment incurs a fee! Does the lease renew? \
                    第一条 合同期限三年。第二条 租金按月支付！第三条 违约责任？ A very long clause \
                    describing every maintenance obligation of both parties in exhaustive detail.";
        for limit in [1usize, 7, 16, 40, 120, 10_000] {
            let chunker = Chunker::new(limit).expect("chunker");
            let chunks = chunker.chunk(text);

            for (position, chunk) in chunks.iter().enumerate() {
                assert_eq!(chunk.index, position);
                let sentence_count = chunk.content.matches(SENTENCE_SUFFIX).count();
                assert!(
                    chunk.approx_length <= limit || sentence_count == 1,
                    "chunk {position} of {} chars exceeds {limit} with {sentence_count} sentences",
                    chunk.approx_length
                );
            }

            let rejoined: Vec<String> = chunks
                .iter()
                .flat_map(|chunk| sentences_of(&chunk.content))
                .collect();
            assert_eq!(rejoined, sentences_of(text), "limit {limit}");
        }
    }
}
