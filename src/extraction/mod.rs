//! Text-layer extraction for PDF documents.
//!
//! [`PdfTextExtractor`] reads the file once, counts pages with `lopdf` and pulls the text layer
//! with `pdf-extract`. Both libraries are synchronous, so the work runs on the blocking pool.
//! Scanned PDFs typically succeed here with very little text; the scan detector decides what
//! happens next.

mod cache;

pub use cache::{CachingExtractor, DocumentFingerprint};

use crate::processing::Document;
use async_trait::async_trait;
use thiserror::Error;

/// Errors raised while reading a document's text layer.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path we attempted to read.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The bytes are not a PDF we can parse.
    #[error("malformed PDF: {0}")]
    Malformed(String),
    /// The blocking extraction task panicked or was cancelled.
    #[error("extraction task aborted: {0}")]
    Aborted(String),
}

/// Text layer of a document plus the numbers needed for density scoring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedText {
    /// Text as returned by the extractor.
    pub text: String,
    /// Number of pages in the document.
    pub page_count: u32,
}

impl ExtractedText {
    /// Number of characters (not bytes) in the text.
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Characters per page; zero when the page count is unknown.
    pub fn density(&self) -> f64 {
        if self.page_count == 0 {
            0.0
        } else {
            self.char_count() as f64 / f64::from(self.page_count)
        }
    }
}

/// Interface implemented by text-layer extractors.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Read the text layer of `document`.
    async fn extract(&self, document: &Document) -> Result<ExtractedText, ExtractionError>;
}

/// Extractor backed by `lopdf` (page tree) and `pdf-extract` (text layer).
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfTextExtractor;

impl PdfTextExtractor {
    /// Construct a new extractor.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl TextExtractor for PdfTextExtractor {
    async fn extract(&self, document: &Document) -> Result<ExtractedText, ExtractionError> {
        let path = document.path();
        tracing::debug!(document = %path.display(), bytes = document.byte_size(), "Reading PDF");
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ExtractionError::Io {
                path: path.display().to_string(),
                source,
            })?;

        let extracted = tokio::task::spawn_blocking(move || extract_from_bytes(&bytes))
            .await
            .map_err(|error| ExtractionError::Aborted(error.to_string()))??;

        tracing::debug!(
            document = %path.display(),
            pages = extracted.page_count,
            chars = extracted.char_count(),
            "Extracted text layer"
        );
        Ok(extracted)
    }
}

fn extract_from_bytes(bytes: &[u8]) -> Result<ExtractedText, ExtractionError> {
    let parsed = lopdf::Document::load_mem(bytes)
        .map_err(|error| ExtractionError::Malformed(error.to_string()))?;
    let page_count = u32::try_from(parsed.get_pages().len()).unwrap_or(u32::MAX);
    let text = pdf_extract::extract_text_from_mem(bytes)
        .map_err(|error| ExtractionError::Malformed(error.to_string()))?;
    Ok(ExtractedText { text, page_count })
}
