//! OCR fallback for documents without a usable text layer.
//!
//! Recognition is split into two capabilities: a [`PageRasterizer`] that renders the first pages
//! of a PDF into images, and an [`OcrEngine`] that hands out [`OcrWorker`]s able to read those
//! images. [`OcrFallback`] drives both within a page budget and a deadline, and always releases
//! the worker and the rasterized images before returning.

mod poppler;
mod tesseract;

pub use poppler::PopplerRasterizer;
pub use tesseract::TesseractEngine;

use crate::processing::{Document, OcrLanguage};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use thiserror::Error;

/// Separator placed between recognized pages.
pub const PAGE_SEPARATOR: &str = "\n\n";

/// Errors raised while rasterizing or recognizing pages.
#[derive(Debug, Error)]
pub enum OcrError {
    /// The rasterizer could not render the document.
    #[error("rasterization failed: {0}")]
    Rasterize(String),
    /// The rasterizer finished without producing any page image.
    #[error("rasterizer produced no page images")]
    NoPages,
    /// The recognizer could not be started.
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),
    /// A page could not be recognized.
    #[error("recognition failed on page {page}: {message}")]
    Recognition {
        /// One-based page number.
        page: u32,
        /// Recognizer diagnostics.
        message: String,
    },
    /// Rasterization or recognition did not finish before the deadline.
    #[error("OCR timed out after {0:?}")]
    Timeout(Duration),
    /// Scratch space for page images could not be prepared.
    #[error("OCR scratch space unavailable: {0}")]
    Io(#[from] std::io::Error),
}

/// A rendered page waiting for recognition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageImage {
    /// One-based page number in the source document.
    pub page_number: u32,
    /// Image location on disk.
    pub path: PathBuf,
}

/// Page images plus the scratch directory that owns them.
///
/// Dropping the value removes the scratch directory and every image in it.
#[derive(Debug)]
pub struct RasterizedPages {
    pages: Vec<PageImage>,
    _scratch: Option<TempDir>,
}

impl RasterizedPages {
    /// Bundle `pages` with the directory that should be deleted alongside them.
    pub fn new(pages: Vec<PageImage>, scratch: Option<TempDir>) -> Self {
        Self {
            pages,
            _scratch: scratch,
        }
    }

    /// Images in page order.
    pub fn pages(&self) -> &[PageImage] {
        &self.pages
    }
}

/// Renders PDF pages to images.
#[async_trait]
pub trait PageRasterizer: Send + Sync {
    /// Render at most `page_limit` pages of `path`, starting from the first page.
    async fn rasterize(
        &self,
        path: &Path,
        page_limit: u32,
        dpi: u32,
    ) -> Result<RasterizedPages, OcrError>;
}

/// Source of recognition workers.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Acquire a worker configured for `language`.
    async fn start_worker(&self, language: OcrLanguage) -> Result<Box<dyn OcrWorker>, OcrError>;

    /// Identifier reported in logs.
    fn name(&self) -> &str;
}

/// A recognizer handle that must be terminated once the caller is done with it.
#[async_trait]
pub trait OcrWorker: Send {
    /// Recognize the text on one page image.
    async fn recognize(&mut self, page: &PageImage) -> Result<String, OcrError>;

    /// Release the worker's resources. Called exactly once on every exit path.
    async fn terminate(&mut self);
}

/// Knobs for [`OcrFallback`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OcrSettings {
    /// Maximum number of pages recognized per document.
    pub page_budget: u32,
    /// Rasterization resolution.
    pub dpi: u32,
    /// Deadline covering rasterization and recognition of every budgeted page.
    pub timeout: Duration,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            page_budget: 5,
            dpi: 300,
            timeout: Duration::from_secs(120),
        }
    }
}

/// Text recovered by OCR.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecognizedText {
    /// Page texts joined with [`PAGE_SEPARATOR`], in page order.
    pub text: String,
    /// Number of pages that were recognized.
    pub pages_recognized: u32,
}

/// Budgeted OCR over a rasterizer and an engine.
pub struct OcrFallback<'a> {
    rasterizer: &'a dyn PageRasterizer,
    engine: &'a dyn OcrEngine,
    settings: OcrSettings,
}

impl<'a> OcrFallback<'a> {
    /// Combine the two capabilities under `settings`.
    pub fn new(
        rasterizer: &'a dyn PageRasterizer,
        engine: &'a dyn OcrEngine,
        settings: OcrSettings,
    ) -> Self {
        Self {
            rasterizer,
            engine,
            settings,
        }
    }

    /// Number of pages that will be recognized for a document with `known_pages` pages.
    ///
    /// Pages beyond the budget are never recognized. An unknown page count (zero) leaves the
    /// budget as the only bound.
    pub fn pages_to_recognize(&self, known_pages: u32) -> u32 {
        if known_pages == 0 {
            self.settings.page_budget
        } else {
            known_pages.min(self.settings.page_budget)
        }
    }

    /// Recognize the first pages of `document` in `language`.
    pub async fn recognize(
        &self,
        document: &Document,
        language: OcrLanguage,
        known_pages: u32,
    ) -> Result<RecognizedText, OcrError> {
        let started = Instant::now();
        let page_limit = self.pages_to_recognize(known_pages);
        if known_pages > page_limit {
            tracing::info!(
                document = %document.path().display(),
                pages = known_pages,
                budget = page_limit,
                "Pages beyond the OCR budget will not be recognized"
            );
        }

        let timeout = self.settings.timeout;
        let deadline = tokio::time::Instant::now() + timeout;

        let rasterized = timeout_at(
            deadline,
            timeout,
            self.rasterizer
                .rasterize(document.path(), page_limit, self.settings.dpi),
        )
        .await?;
        if rasterized.pages().is_empty() {
            return Err(OcrError::NoPages);
        }

        let mut worker = timeout_at(deadline, timeout, self.engine.start_worker(language)).await?;
        let outcome = timeout_at(
            deadline,
            timeout,
            recognize_pages(worker.as_mut(), rasterized.pages(), page_limit),
        )
        .await;
        worker.terminate().await;
        drop(rasterized);

        let recognized = outcome?;

        tracing::info!(
            document = %document.path().display(),
            engine = self.engine.name(),
            language = language.as_str(),
            pages = recognized.pages_recognized,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "OCR completed"
        );
        Ok(recognized)
    }
}

/// Run `future` until `deadline`; dropping it on expiry kills any child process it owns.
async fn timeout_at<T>(
    deadline: tokio::time::Instant,
    timeout: Duration,
    future: impl Future<Output = Result<T, OcrError>>,
) -> Result<T, OcrError> {
    tokio::time::timeout_at(deadline, future)
        .await
        .unwrap_or(Err(OcrError::Timeout(timeout)))
}

async fn recognize_pages(
    worker: &mut dyn OcrWorker,
    pages: &[PageImage],
    page_limit: u32,
) -> Result<RecognizedText, OcrError> {
    let mut ordered: Vec<&PageImage> = pages.iter().collect();
    ordered.sort_by_key(|page| page.page_number);

    let mut texts = Vec::with_capacity(ordered.len());
    for page in ordered.into_iter().take(page_limit as usize) {
        let text = worker.recognize(page).await?;
        tracing::debug!(page = page.page_number, chars = text.chars().count(), "Recognized page");
        texts.push(text.trim().to_string());
    }

    Ok(RecognizedText {
        pages_recognized: texts.len() as u32,
        text: texts.join(PAGE_SEPARATOR),
    })
}
