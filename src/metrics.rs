use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing pipeline activity.
#[derive(Default)]
pub struct PipelineMetrics {
    documents_processed: AtomicU64,
    documents_failed: AtomicU64,
    ocr_documents: AtomicU64,
    chunks_produced: AtomicU64,
    last_elapsed_ms: AtomicU64,
}

impl PipelineMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed run along with its chunk count and duration.
    pub fn record_success(&self, chunk_count: u64, ocr_used: bool, elapsed_ms: u64) {
        self.documents_processed.fetch_add(1, Ordering::Relaxed);
        self.chunks_produced
            .fetch_add(chunk_count, Ordering::Relaxed);
        if ocr_used {
            self.ocr_documents.fetch_add(1, Ordering::Relaxed);
        }
        self.last_elapsed_ms.store(elapsed_ms, Ordering::Relaxed);
    }

    /// Record a run that ended in the `Failed` state.
    pub fn record_failure(&self, elapsed_ms: u64) {
        self.documents_failed.fetch_add(1, Ordering::Relaxed);
        self.last_elapsed_ms.store(elapsed_ms, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let processed = self.documents_processed.load(Ordering::Relaxed);
        let failed = self.documents_failed.load(Ordering::Relaxed);
        let last = if processed + failed == 0 {
            None
        } else {
            Some(self.last_elapsed_ms.load(Ordering::Relaxed))
        };
        MetricsSnapshot {
            documents_processed: processed,
            documents_failed: failed,
            ocr_documents: self.ocr_documents.load(Ordering::Relaxed),
            chunks_produced: self.chunks_produced.load(Ordering::Relaxed),
            last_elapsed_ms: last,
        }
    }
}

/// Immutable view of pipeline counters used for reporting.
#[derive(Debug, Clone, Copy, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    /// Documents that reached `Done` since startup.
    pub documents_processed: u64,
    /// Documents that ended in `Failed` since startup.
    pub documents_failed: u64,
    /// Successful documents whose text came from OCR.
    pub ocr_documents: u64,
    /// Total chunks handed to the summarizer.
    pub chunks_produced: u64,
    /// Wall time of the most recent run, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_elapsed_ms: Option<u64>,
}
