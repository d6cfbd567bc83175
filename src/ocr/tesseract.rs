use super::{OcrEngine, OcrError, OcrWorker, PageImage};
use crate::processing::OcrLanguage;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// Engine that recognizes pages with the `tesseract` CLI.
#[derive(Debug, Clone)]
pub struct TesseractEngine {
    binary: PathBuf,
}

impl TesseractEngine {
    /// Use the `tesseract` executable at `binary` (a bare name is resolved through `PATH`).
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for TesseractEngine {
    fn default() -> Self {
        Self::new("tesseract")
    }
}

#[async_trait]
impl OcrEngine for TesseractEngine {
    async fn start_worker(&self, language: OcrLanguage) -> Result<Box<dyn OcrWorker>, OcrError> {
        let probe = Command::new(&self.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|error| {
                OcrError::EngineUnavailable(format!("{}: {error}", self.binary.display()))
            })?;
        if !probe.success() {
            return Err(OcrError::EngineUnavailable(format!(
                "{} --version exited with {probe}",
                self.binary.display()
            )));
        }

        Ok(Box::new(TesseractWorker {
            binary: self.binary.clone(),
            language,
            pages_recognized: 0,
            terminated: false,
        }))
    }

    fn name(&self) -> &str {
        "tesseract"
    }
}

/// One recognition session.
///
/// Each page runs in its own child process with `kill_on_drop`, so a recognition future dropped
/// by a deadline takes its process down with it.
struct TesseractWorker {
    binary: PathBuf,
    language: OcrLanguage,
    pages_recognized: u32,
    terminated: bool,
}

#[async_trait]
impl OcrWorker for TesseractWorker {
    async fn recognize(&mut self, page: &PageImage) -> Result<String, OcrError> {
        if self.terminated {
            return Err(OcrError::EngineUnavailable("worker already terminated".into()));
        }
        let output = Command::new(&self.binary)
            .arg(&page.path)
            .arg("stdout")
            .arg("-l")
            .arg(self.language.as_str())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|error| OcrError::Recognition {
                page: page.page_number,
                message: error.to_string(),
            })?;

        if !output.status.success() {
            return Err(OcrError::Recognition {
                page: page.page_number,
                message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        self.pages_recognized += 1;
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn terminate(&mut self) {
        self.terminated = true;
        tracing::debug!(
            language = self.language.as_str(),
            pages = self.pages_recognized,
            "Tesseract worker released"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_binary_is_reported_as_unavailable() {
        let engine = TesseractEngine::new("/nonexistent/tesseract");
        let error = engine
            .start_worker(OcrLanguage::ChiSim)
            .await
            .err()
            .expect("binary missing");
        assert!(matches!(error, OcrError::EngineUnavailable(_)));
    }

    #[tokio::test]
    #[ignore = "requires tesseract with the eng language pack"]
    async fn worker_terminates_cleanly_without_pages() {
        let engine = TesseractEngine::default();
        let mut worker = engine.start_worker(OcrLanguage::Eng).await.expect("worker");
        worker.terminate().await;
    }
}
