//! Text normalization applied between extraction and chunking.
//!
//! Normalization runs in a fixed order: strip characters outside the allowed alphabet, collapse
//! whitespace, trim. Stripping first means removed characters can never leave behind a new
//! whitespace run, so a second pass is always a no-op.

use crate::config::Config;

/// Alphabet filter plus whitespace policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TextPreprocessor {
    keep_cjk_punctuation: bool,
    preserve_paragraphs: bool,
}

impl TextPreprocessor {
    /// Default alphabet (CJK ideographs, ASCII, whitespace) with whitespace fully collapsed.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the preprocessor described by configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new()
            .with_cjk_punctuation(config.keep_cjk_punctuation)
            .with_paragraphs(config.preserve_paragraphs)
    }

    /// Also allow CJK symbols and full-width forms (`。，！？：` and friends).
    pub fn with_cjk_punctuation(mut self, keep: bool) -> Self {
        self.keep_cjk_punctuation = keep;
        self
    }

    /// Keep single line breaks and paragraph breaks instead of flattening them to spaces.
    ///
    /// A whitespace run containing one newline becomes `\n`; two or more become `\n\n`.
    pub fn with_paragraphs(mut self, preserve: bool) -> Self {
        self.preserve_paragraphs = preserve;
        self
    }

    /// Normalize `raw`. Deterministic and idempotent.
    pub fn normalize(&self, raw: &str) -> String {
        let mut output = String::with_capacity(raw.len());
        let mut pending_spaces = false;
        let mut pending_newlines = 0usize;

        for character in raw.chars().filter(|c| self.allows(*c)) {
            if character.is_whitespace() {
                pending_spaces = true;
                if character == '\n' {
                    pending_newlines += 1;
                }
                continue;
            }
            if pending_spaces && !output.is_empty() {
                output.push_str(self.separator(pending_newlines));
            }
            pending_spaces = false;
            pending_newlines = 0;
            output.push(character);
        }

        // Leading runs are skipped above and trailing runs are never flushed, so the result is
        // already trimmed.
        output
    }

    fn separator(&self, newlines: usize) -> &'static str {
        if !self.preserve_paragraphs {
            return " ";
        }
        match newlines {
            0 => " ",
            1 => "\n",
            _ => "\n\n",
        }
    }

    fn allows(&self, character: char) -> bool {
        if character.is_ascii() || character.is_whitespace() {
            return true;
        }
        if ('\u{4E00}'..='\u{9FA5}').contains(&character) {
            return true;
        }
        self.keep_cjk_punctuation
            && (('\u{3000}'..='\u{303F}').contains(&character)
                || ('\u{FF00}'..='\u{FFEF}').contains(&character))
    }
}
