//! Pipeline tests with in-process extraction and annotation backends.

use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::sync::mpsc;

use stixtract::llm::LlmError;
use stixtract::ocr::{
    Classification, ExtractionError, ExtractionMethod, NativeExtractor, NativeText, OcrBackend,
    OcrError, OcrResult, TextExtractor,
};
use stixtract::services::{
    Annotation, AnnotationError, Annotator, ChunkErrorPolicy, Pipeline, PipelineError,
    PipelineEvent,
};
use stixtract::Chunker;

struct FixedNative(Option<&'static str>);

impl NativeExtractor for FixedNative {
    fn extract_text(&self, pdf_path: &Path) -> Result<NativeText, ExtractionError> {
        match self.0 {
            Some(text) => Ok(NativeText {
                text: text.to_string(),
                page_count: 2,
            }),
            None => Err(ExtractionError::NotFound(pdf_path.to_path_buf())),
        }
    }
}

struct FixedOcr {
    text: &'static str,
    calls: Arc<AtomicUsize>,
}

impl OcrBackend for FixedOcr {
    fn name(&self) -> &str {
        "fixed"
    }

    fn is_available(&self) -> bool {
        true
    }

    fn availability_hint(&self) -> String {
        String::new()
    }

    fn ocr_pdf(&self, _pdf_path: &Path) -> Result<OcrResult, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(OcrResult {
            text: self.text.to_string(),
            page_count: 3,
            processing_time_ms: 0,
        })
    }
}

/// Echoes each chunk back, failing on chunks listed in `fail_on`.
#[derive(Default)]
struct EchoAnnotator {
    fail_on: Vec<usize>,
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl Annotator for EchoAnnotator {
    fn display_name(&self) -> &str {
        "echo"
    }

    async fn annotate(&self, chunk: &str) -> Result<Annotation, AnnotationError> {
        let index = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(chunk.to_string());
            seen.len() - 1
        };
        if self.fail_on.contains(&index) {
            return Err(LlmError::Api {
                status: 400,
                body: "bad request".to_string(),
            }
            .into());
        }
        Ok(Annotation {
            text: format!("[{}]", chunk),
            bundle: None,
        })
    }
}

fn pipeline(
    native: Option<&'static str>,
    ocr_text: &'static str,
    annotator: EchoAnnotator,
    chunk_size: usize,
    policy: ChunkErrorPolicy,
) -> (Pipeline, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let extractor = TextExtractor::with_backends(
        Box::new(FixedNative(native)),
        Box::new(FixedOcr {
            text: ocr_text,
            calls: calls.clone(),
        }),
    );
    let pipeline = Pipeline::new(
        extractor,
        Chunker::new(chunk_size).unwrap(),
        Box::new(annotator),
        policy,
    );
    (pipeline, calls)
}

async fn run(
    pipeline: &Pipeline,
    output: &Path,
) -> (
    Result<stixtract::PipelineReport, PipelineError>,
    Vec<PipelineEvent>,
) {
    let (tx, mut rx) = mpsc::channel(100);
    let result = pipeline.run(Path::new("doc.pdf"), output, tx).await;
    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }
    (result, events)
}

#[tokio::test]
async fn test_blocks_written_in_chunk_order() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");
    let (pipeline, ocr_calls) = pipeline(
        Some("ABCDEFGHIJ"),
        "",
        EchoAnnotator::default(),
        4,
        ChunkErrorPolicy::Abort,
    );

    let (result, events) = run(&pipeline, &output).await;
    let report = result.unwrap();

    assert_eq!(report.classification, Classification::NativeText);
    assert_eq!(report.chunks_total, 3);
    assert_eq!(report.chunks_written, 3);
    assert!(report.is_success());
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 0);

    let content = std::fs::read_to_string(&output).unwrap();
    assert_eq!(
        content,
        "Entities and structured graph interpretation:\n[ABCD]\n\n\
         Entities and structured graph interpretation:\n[EFGH]\n\n\
         Entities and structured graph interpretation:\n[IJ]\n\n"
    );

    assert!(matches!(
        events.first(),
        Some(PipelineEvent::Extracted {
            method: ExtractionMethod::PdfToText,
            chars: 10,
            ..
        })
    ));
    assert!(matches!(
        events.last(),
        Some(PipelineEvent::Complete {
            written: 3,
            failed: 0
        })
    ));
}

#[tokio::test]
async fn test_image_based_pdf_uses_ocr_text() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");
    let (pipeline, ocr_calls) = pipeline(
        Some("  \n\x0c "),
        "scanned words",
        EchoAnnotator::default(),
        2000,
        ChunkErrorPolicy::Abort,
    );

    let (result, _) = run(&pipeline, &output).await;
    let report = result.unwrap();

    assert_eq!(report.classification, Classification::ImageBased);
    assert_eq!(report.page_count, 3);
    assert_eq!(ocr_calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Entities and structured graph interpretation:\n[scanned words]\n\n"
    );
}

#[tokio::test]
async fn test_empty_text_writes_empty_output() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");
    let (pipeline, _) = pipeline(
        Some(""),
        "",
        EchoAnnotator::default(),
        2000,
        ChunkErrorPolicy::Abort,
    );

    let (result, events) = run(&pipeline, &output).await;
    let report = result.unwrap();

    assert_eq!(report.chunks_total, 0);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
    assert!(!events
        .iter()
        .any(|e| matches!(e, PipelineEvent::ChunkStarted { .. })));
}

#[tokio::test]
async fn test_abort_keeps_blocks_before_failure() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");
    let annotator = EchoAnnotator {
        fail_on: vec![1],
        ..EchoAnnotator::default()
    };
    let (pipeline, _) = pipeline(
        Some("ABCDEFGHIJ"),
        "",
        annotator,
        4,
        ChunkErrorPolicy::Abort,
    );

    let (result, events) = run(&pipeline, &output).await;

    assert!(matches!(result, Err(PipelineError::Chunk { index: 1, .. })));
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Entities and structured graph interpretation:\n[ABCD]\n\n"
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, PipelineEvent::ChunkStarted { index: 2 })));
}

#[tokio::test]
async fn test_continue_skips_failed_chunk() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");
    let annotator = EchoAnnotator {
        fail_on: vec![1],
        ..EchoAnnotator::default()
    };
    let (pipeline, _) = pipeline(
        Some("ABCDEFGHIJ"),
        "",
        annotator,
        4,
        ChunkErrorPolicy::Continue,
    );

    let (result, _) = run(&pipeline, &output).await;
    let report = result.unwrap();

    assert_eq!(report.chunks_written, 2);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].index, 1);
    assert!(!report.is_success());
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Entities and structured graph interpretation:\n[ABCD]\n\n\
         Entities and structured graph interpretation:\n[IJ]\n\n"
    );
}

#[tokio::test]
async fn test_extraction_failure_leaves_no_output() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");
    let (pipeline, _) = pipeline(
        None,
        "",
        EchoAnnotator::default(),
        2000,
        ChunkErrorPolicy::Abort,
    );

    let (result, events) = run(&pipeline, &output).await;

    assert!(matches!(
        result,
        Err(PipelineError::Extraction(ExtractionError::NotFound(_)))
    ));
    assert!(!output.exists());
    assert!(events.is_empty());
}

#[tokio::test]
async fn test_existing_output_is_overwritten() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");
    std::fs::write(&output, "stale contents").unwrap();
    let (pipeline, _) = pipeline(
        Some("fresh"),
        "",
        EchoAnnotator::default(),
        2000,
        ChunkErrorPolicy::Abort,
    );

    let (result, _) = run(&pipeline, &output).await;
    result.unwrap();

    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Entities and structured graph interpretation:\n[fresh]\n\n"
    );
}

/// Native extractor that needs to block the calling thread.
struct BlockingNative;

impl NativeExtractor for BlockingNative {
    fn extract_text(&self, _pdf_path: &Path) -> Result<NativeText, ExtractionError> {
        // Panics when called from an async task instead of a blocking thread.
        let text = tokio::runtime::Handle::current().block_on(async { "blocking text".to_string() });
        Ok(NativeText {
            text,
            page_count: 1,
        })
    }
}

#[tokio::test]
async fn test_extraction_runs_off_the_async_executor() {
    let dir = TempDir::new().unwrap();
    let output = dir.path().join("out.txt");
    let extractor = TextExtractor::with_backends(
        Box::new(BlockingNative),
        Box::new(FixedOcr {
            text: "",
            calls: Arc::new(AtomicUsize::new(0)),
        }),
    );
    let pipeline = Pipeline::new(
        extractor,
        Chunker::new(2000).unwrap(),
        Box::new(EchoAnnotator::default()),
        ChunkErrorPolicy::Abort,
    );

    let (result, _) = run(&pipeline, &output).await;

    assert_eq!(result.unwrap().chunks_written, 1);
    assert_eq!(
        std::fs::read_to_string(&output).unwrap(),
        "Entities and structured graph interpretation:\n[blocking text]\n\n"
    );
}
