use super::{OcrError, PageImage, PageRasterizer, RasterizedPages};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Rasterizer that shells out to poppler's `pdftoppm`.
#[derive(Debug, Clone)]
pub struct PopplerRasterizer {
    binary: PathBuf,
}

impl PopplerRasterizer {
    /// Use the `pdftoppm` executable at `binary` (a bare name is resolved through `PATH`).
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for PopplerRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

#[async_trait]
impl PageRasterizer for PopplerRasterizer {
    async fn rasterize(
        &self,
        path: &Path,
        page_limit: u32,
        dpi: u32,
    ) -> Result<RasterizedPages, OcrError> {
        let scratch = tempfile::tempdir()?;
        let prefix = scratch.path().join("page");

        let output = Command::new(&self.binary)
            .arg("-png")
            .arg("-r")
            .arg(dpi.to_string())
            .arg("-f")
            .arg("1")
            .arg("-l")
            .arg(page_limit.max(1).to_string())
            .arg(path)
            .arg(&prefix)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| {
                OcrError::Rasterize(format!(
                    "failed to run {}: {error}",
                    self.binary.display()
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Rasterize(format!(
                "{} exited with {}: {}",
                self.binary.display(),
                output.status,
                stderr.trim()
            )));
        }

        let mut pages = Vec::new();
        let mut entries = tokio::fs::read_dir(scratch.path()).await?;
        while let Some(entry) = entries.next_entry().await? {
            let image = entry.path();
            if let Some(page_number) = page_number_from_file_name(&image) {
                pages.push(PageImage {
                    page_number,
                    path: image,
                });
            }
        }
        pages.sort_by_key(|page| page.page_number);

        tracing::debug!(
            document = %path.display(),
            pages = pages.len(),
            dpi,
            "Rasterized pages"
        );
        Ok(RasterizedPages::new(pages, Some(scratch)))
    }
}

/// `pdftoppm` names images `<prefix>-<n>.png`, zero-padding `n` to the width of the page count.
fn page_number_from_file_name(path: &Path) -> Option<u32> {
    if path.extension()? != "png" {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let (_, number) = stem.rsplit_once('-')?;
    number.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_padded_page_numbers() {
        assert_eq!(page_number_from_file_name(Path::new("/tmp/x/page-1.png")), Some(1));
        assert_eq!(page_number_from_file_name(Path::new("/tmp/x/page-012.png")), Some(12));
        assert_eq!(page_number_from_file_name(Path::new("/tmp/x/page-1.ppm")), None);
        assert_eq!(page_number_from_file_name(Path::new("/tmp/x/notes.png")), None);
    }

    #[tokio::test]
    async fn missing_binary_is_a_rasterize_error() {
        let rasterizer = PopplerRasterizer::new("/nonexistent/pdftoppm");
        let error = rasterizer
            .rasterize(Path::new("/tmp/none.pdf"), 1, 72)
            .await
            .expect_err("binary missing");
        assert!(matches!(error, OcrError::Rasterize(_)));
    }

    #[tokio::test]
    #[ignore = "requires poppler-utils and a sample PDF at SMARTSUM_SAMPLE_PDF"]
    async fn rasterizes_sample_document() {
        let sample = std::env::var("SMARTSUM_SAMPLE_PDF").expect("SMARTSUM_SAMPLE_PDF");
        let pages = PopplerRasterizer::default()
            .rasterize(Path::new(&sample), 2, 72)
            .await
            .expect("rasterize");
        assert!(!pages.pages().is_empty());
        assert!(pages.pages().len() <= 2);
    }
}
