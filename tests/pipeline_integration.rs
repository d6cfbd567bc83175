use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use smartsum::{
    extraction::{ExtractedText, ExtractionError, TextExtractor},
    ocr::{OcrEngine, OcrError, OcrWorker, PageImage, PageRasterizer, RasterizedPages},
    processing::{Document, OcrLanguage, Pipeline, PipelineComponents, PipelineSettings},
    summarization::ExtractiveSummarizationClient,
};
use tempfile::TempDir;

const CONTRACT_PAGE: &str = "The supplier shall deliver the goods within thirty days. \
    Late delivery triggers a penalty of one percent per day. \
    Either party may terminate the agreement after written notice. \
    Payment is due upon acceptance of the delivered goods.";

#[derive(Default)]
struct Calls {
    extract: AtomicUsize,
    rasterize: AtomicUsize,
    recognize: AtomicUsize,
    terminate: AtomicUsize,
}

enum ExtractorBehavior {
    Text { text: String, pages: u32 },
    Fail,
}

struct StubExtractor {
    behavior: ExtractorBehavior,
    calls: Arc<Calls>,
}

#[async_trait]
impl TextExtractor for StubExtractor {
    async fn extract(&self, _document: &Document) -> Result<ExtractedText, ExtractionError> {
        self.calls.extract.fetch_add(1, Ordering::SeqCst);
        match &self.behavior {
            ExtractorBehavior::Text { text, pages } => Ok(ExtractedText {
                text: text.clone(),
                page_count: *pages,
            }),
            ExtractorBehavior::Fail => Err(ExtractionError::Malformed("no xref table".into())),
        }
    }
}

struct StubRasterizer {
    calls: Arc<Calls>,
}

#[async_trait]
impl PageRasterizer for StubRasterizer {
    async fn rasterize(
        &self,
        path: &Path,
        page_limit: u32,
        _dpi: u32,
    ) -> Result<RasterizedPages, OcrError> {
        self.calls.rasterize.fetch_add(1, Ordering::SeqCst);
        let pages = (1..=page_limit)
            .map(|page_number| PageImage {
                page_number,
                path: path.with_file_name(format!("page-{page_number}.png")),
            })
            .collect();
        Ok(RasterizedPages::new(pages, None))
    }
}

struct StubEngine {
    fail: bool,
    calls: Arc<Calls>,
}

#[async_trait]
impl OcrEngine for StubEngine {
    async fn start_worker(&self, _language: OcrLanguage) -> Result<Box<dyn OcrWorker>, OcrError> {
        Ok(Box::new(StubWorker {
            fail: self.fail,
            calls: self.calls.clone(),
        }))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

struct StubWorker {
    fail: bool,
    calls: Arc<Calls>,
}

#[async_trait]
impl OcrWorker for StubWorker {
    async fn recognize(&mut self, page: &PageImage) -> Result<String, OcrError> {
        self.calls.recognize.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(OcrError::Recognition {
                page: page.page_number,
                message: "engine crashed".into(),
            });
        }
        Ok("识别文本".into())
    }

    async fn terminate(&mut self) {
        self.calls.terminate.fetch_add(1, Ordering::SeqCst);
    }
}

struct Fixture {
    pipeline: Pipeline,
    calls: Arc<Calls>,
    _dir: TempDir,
    document: PathBuf,
}

fn fixture(behavior: ExtractorBehavior, ocr_fails: bool, write_output: bool) -> Fixture {
    let dir = tempfile::tempdir().expect("tempdir");
    let document = dir.path().join("contract.pdf");
    std::fs::write(&document, b"%PDF-1.4 stub").expect("write stub pdf");

    let calls = Arc::new(Calls::default());
    let components = PipelineComponents {
        extractor: Arc::new(StubExtractor {
            behavior,
            calls: calls.clone(),
        }),
        rasterizer: Arc::new(StubRasterizer {
            calls: calls.clone(),
        }),
        ocr_engine: Arc::new(StubEngine {
            fail: ocr_fails,
            calls: calls.clone(),
        }),
        summarization_client: Arc::new(ExtractiveSummarizationClient::new()),
    };
    let settings = PipelineSettings {
        write_output,
        ..PipelineSettings::default()
    };

    Fixture {
        pipeline: Pipeline::new(components, settings),
        calls,
        _dir: dir,
        document,
    }
}

fn request(document: &Path, overrides: Value) -> Value {
    let mut base = json!({
        "documentPath": document.display().to_string(),
        "role": "lawyer",
        "goal": "梳理违约责任",
        "outputFormat": "markdown",
    });
    if let (Some(base), Some(extra)) = (base.as_object_mut(), overrides.as_object()) {
        for (key, value) in extra {
            base.insert(key.clone(), value.clone());
        }
    }
    base
}

#[tokio::test]
async fn text_layer_document_is_summarized_and_written() {
    let fx = fixture(
        ExtractorBehavior::Text {
            text: format!("{CONTRACT_PAGE}\n\n{CONTRACT_PAGE}"),
            pages: 2,
        },
        false,
        true,
    );

    let response = fx
        .pipeline
        .execute(request(&fx.document, json!({"includeOriginalText": false})))
        .await
        .to_value();

    assert_eq!(response["success"], true, "{response}");
    let info = &response["data"]["processingInfo"];
    assert_eq!(info["pdfType"], "text");
    assert_eq!(info["ocrUsed"], false);
    assert_eq!(info["pageCount"], 2);
    assert_eq!(info["aiModelUsed"], "extractive");
    assert!(response["data"].get("originalText").is_none());
    assert_eq!(response["data"]["summary"]["userRole"], "lawyer");

    let written = fx.document.with_file_name("contract_智能总结.md");
    assert_eq!(info["outputPath"], written.display().to_string());
    let rendered = std::fs::read_to_string(&written).expect("summary written");
    assert!(!rendered.trim().is_empty());

    assert_eq!(fx.calls.extract.load(Ordering::SeqCst), 1);
    assert_eq!(fx.calls.rasterize.load(Ordering::SeqCst), 0);

    let metrics = fx.pipeline.metrics().snapshot();
    assert_eq!(metrics.documents_processed, 1);
    assert_eq!(metrics.ocr_documents, 0);
}

#[tokio::test]
async fn sparse_text_layer_falls_back_to_ocr() {
    let fx = fixture(
        ExtractorBehavior::Text {
            text: "扫描件".into(),
            pages: 3,
        },
        false,
        false,
    );

    let response = fx
        .pipeline
        .execute(request(&fx.document, json!({})))
        .await
        .to_value();

    assert_eq!(response["success"], true, "{response}");
    let info = &response["data"]["processingInfo"];
    assert_eq!(info["pdfType"], "scanned");
    assert_eq!(info["ocrUsed"], true);
    assert_eq!(info["pageCount"], 3);
    assert!(info.get("outputPath").is_none());
    assert_eq!(
        response["data"]["originalText"],
        "识别文本\n\n识别文本\n\n识别文本"
    );

    let stages: Vec<&str> = info["stageTimings"]
        .as_array()
        .expect("stage timings")
        .iter()
        .filter_map(|timing| timing["stage"].as_str())
        .collect();
    assert!(stages.contains(&"ocr_recognizing"));

    assert_eq!(fx.calls.recognize.load(Ordering::SeqCst), 3);
    assert_eq!(fx.calls.terminate.load(Ordering::SeqCst), 1);
    assert_eq!(fx.pipeline.metrics().snapshot().ocr_documents, 1);
}

#[tokio::test]
async fn single_sparse_page_is_recognized_as_scanned() {
    let fx = fixture(
        ExtractorBehavior::Text {
            text: "甲".repeat(40),
            pages: 1,
        },
        false,
        false,
    );

    let response = fx
        .pipeline
        .execute(request(&fx.document, json!({})))
        .await
        .to_value();

    assert_eq!(response["success"], true, "{response}");
    assert_eq!(response["data"]["processingInfo"]["pdfType"], "scanned");
    assert_eq!(response["data"]["processingInfo"]["ocrUsed"], true);
    assert_eq!(response["data"]["originalText"], "识别文本");
    assert_eq!(fx.calls.recognize.load(Ordering::SeqCst), 1);
    assert_eq!(fx.calls.terminate.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn original_text_in_response_is_capped() {
    let fx = fixture(
        ExtractorBehavior::Text {
            text: CONTRACT_PAGE.repeat(40),
            pages: 2,
        },
        false,
        false,
    );

    let response = fx
        .pipeline
        .execute(request(&fx.document, json!({"includeOriginalText": true})))
        .await
        .to_value();

    assert_eq!(response["success"], true, "{response}");
    let original = response["data"]["originalText"]
        .as_str()
        .expect("original text");
    assert!(CONTRACT_PAGE.repeat(40).chars().count() > 5000);
    assert!(original.starts_with(&CONTRACT_PAGE[..40]));
    assert!(original.chars().count() < 5100);
    assert!(!original.ends_with(CONTRACT_PAGE));
}

#[tokio::test]
async fn overlong_goal_is_rejected_before_extraction() {
    let fx = fixture(
        ExtractorBehavior::Text {
            text: CONTRACT_PAGE.into(),
            pages: 1,
        },
        false,
        false,
    );

    let response = fx
        .pipeline
        .execute(request(&fx.document, json!({"goal": "要".repeat(501)})))
        .await
        .to_value();

    assert_eq!(response["success"], false);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(response["error"]["details"]["issues"][0]["field"], "goal");
    assert_eq!(fx.calls.extract.load(Ordering::SeqCst), 0);
    assert_eq!(fx.pipeline.metrics().snapshot().documents_failed, 0);
}

#[tokio::test]
async fn extraction_failure_without_ocr_is_a_file_error() {
    let fx = fixture(ExtractorBehavior::Fail, false, false);

    let response = fx
        .pipeline
        .execute(request(&fx.document, json!({"enableOcr": false})))
        .await
        .to_value();

    assert_eq!(response["success"], false);
    assert_eq!(response["error"]["code"], "FILE_ERROR");
    assert_eq!(response["error"]["details"]["stage"], "extracting");
    assert_eq!(fx.calls.rasterize.load(Ordering::SeqCst), 0);
    assert_eq!(fx.pipeline.metrics().snapshot().documents_failed, 1);
}

#[tokio::test]
async fn recognition_failure_terminates_worker() {
    let fx = fixture(ExtractorBehavior::Fail, true, false);

    let response = fx
        .pipeline
        .execute(request(&fx.document, json!({})))
        .await
        .to_value();

    assert_eq!(response["success"], false);
    assert_eq!(response["error"]["code"], "OCR_ERROR");
    assert_eq!(response["error"]["details"]["stage"], "ocr_recognizing");
    assert_eq!(fx.calls.recognize.load(Ordering::SeqCst), 1);
    assert_eq!(fx.calls.terminate.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_document_is_reported_with_other_issues() {
    let fx = fixture(ExtractorBehavior::Fail, false, false);
    let missing = fx.document.with_file_name("absent.pdf");

    let response = fx
        .pipeline
        .execute(json!({
            "pdfPath": missing.display().to_string(),
            "userRole": "student",
            "summaryRequest": "",
            "level": "exhaustive",
        }))
        .await
        .to_value();

    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
    let fields: Vec<&str> = response["error"]["details"]["issues"]
        .as_array()
        .expect("issues")
        .iter()
        .filter_map(|issue| issue["field"].as_str())
        .collect();
    assert!(fields.contains(&"goal"));
    assert!(fields.contains(&"level"));
    assert!(fields.contains(&"documentPath"));
    assert_eq!(fx.calls.extract.load(Ordering::SeqCst), 0);
}
