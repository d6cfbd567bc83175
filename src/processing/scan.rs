//! Text-versus-scan decision.

/// Characters per page below which a document is treated as scanned.
pub const DEFAULT_DENSITY_THRESHOLD: usize = 100;

/// Outcome of [`ScanDetector::decide`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanDecision {
    /// Whether the OCR path should run.
    pub use_ocr: bool,
}

/// Density policy deciding when to fall back to OCR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanDetector {
    threshold: usize,
}

impl Default for ScanDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DENSITY_THRESHOLD)
    }
}

impl ScanDetector {
    /// Detector using `threshold` characters per page.
    pub fn new(threshold: usize) -> Self {
        Self { threshold }
    }

    /// `use_ocr = ocr_enabled && char_count / page_count < threshold`.
    ///
    /// With a page count of zero the density is undefined; OCR then runs only when there is no
    /// text at all.
    pub fn decide(&self, char_count: usize, page_count: u32, ocr_enabled: bool) -> ScanDecision {
        if !ocr_enabled {
            return ScanDecision { use_ocr: false };
        }
        // Compare in integers: count / pages < threshold  <=>  count < threshold * pages.
        let sparse = if page_count == 0 {
            char_count == 0
        } else {
            (char_count as u128) < (self.threshold as u128) * u128::from(page_count)
        };
        ScanDecision { use_ocr: sparse }
    }

    /// Decision when the text layer could not be read at all.
    pub fn decide_after_failure(&self, ocr_enabled: bool) -> ScanDecision {
        ScanDecision {
            use_ocr: ocr_enabled,
        }
    }
}
