//! Text extraction from PDFs: native text layer first, OCR when there is none.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use super::backend::{OcrBackend, OcrConfig, OcrError};
use super::pdftotext::{NativeExtractor, NativeText, PdfTextExtractor};
use super::tesseract::TesseractBackend;
use super::tools::ToolError;

/// Errors that can occur during text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("Source document not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Invalid or unreadable PDF: {0}")]
    InvalidDocument(String),

    #[error("External tool not found: {0}")]
    ToolNotFound(String),

    #[error(transparent)]
    Ocr(#[from] OcrError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    pub(crate) fn from_tool(err: ToolError, pdf_path: &Path) -> Self {
        match err {
            ToolError::NotFound(tool) => ExtractionError::ToolNotFound(tool),
            ToolError::Failed(msg) => {
                ExtractionError::InvalidDocument(format!("{}: {}", pdf_path.display(), msg))
            }
            ToolError::Io(e) => ExtractionError::Io(e),
        }
    }
}

/// How a document carries its text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The PDF has an extractable text layer.
    NativeText,
    /// No text layer (typically a scan); needs OCR.
    ImageBased,
}

impl Classification {
    /// Image-based iff the native text is empty after trimming whitespace.
    pub fn of(native_text: &str) -> Self {
        if native_text.trim().is_empty() {
            Classification::ImageBased
        } else {
            Classification::NativeText
        }
    }

    pub fn is_image_based(&self) -> bool {
        matches!(self, Classification::ImageBased)
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Classification::NativeText => write!(f, "text-based"),
            Classification::ImageBased => write!(f, "image-based"),
        }
    }
}

/// Method used to extract text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionMethod {
    /// Direct text extraction from PDF.
    PdfToText,
    /// OCR using Tesseract.
    TesseractOcr,
}

/// Result of text extraction.
#[derive(Debug, Clone)]
pub struct ExtractedText {
    /// Extracted text content.
    pub text: String,
    pub classification: Classification,
    pub method: ExtractionMethod,
    pub page_count: u32,
}

/// Text extractor that classifies a PDF and picks native extraction or OCR.
pub struct TextExtractor {
    native: Box<dyn NativeExtractor>,
    ocr: Box<dyn OcrBackend>,
}

impl TextExtractor {
    /// Poppler for the text layer, Tesseract for OCR.
    pub fn from_config(config: &OcrConfig) -> Self {
        Self {
            native: Box::new(PdfTextExtractor::new(config.tools.clone())),
            ocr: Box::new(TesseractBackend::with_config(config.clone())),
        }
    }

    pub fn with_backends(native: Box<dyn NativeExtractor>, ocr: Box<dyn OcrBackend>) -> Self {
        Self { native, ocr }
    }

    /// Decide whether a document is image-based.
    pub fn classify(&self, pdf_path: &Path) -> Result<Classification, ExtractionError> {
        let native = self.native.extract_text(pdf_path)?;
        Ok(Classification::of(&native.text))
    }

    /// Extract a document's text, running OCR only when the text layer is empty.
    ///
    /// The native pass used for classification is kept as the result for
    /// text-based documents.
    pub fn extract(&self, pdf_path: &Path) -> Result<ExtractedText, ExtractionError> {
        let NativeText { text, page_count } = self.native.extract_text(pdf_path)?;
        let classification = Classification::of(&text);

        if !classification.is_image_based() {
            info!("PDF is text-based ({} pages)", page_count);
            return Ok(ExtractedText {
                text,
                classification,
                method: ExtractionMethod::PdfToText,
                page_count,
            });
        }

        if page_count == 0 {
            info!("PDF has no pages, nothing to OCR");
            return Ok(ExtractedText {
                text,
                classification,
                method: ExtractionMethod::PdfToText,
                page_count,
            });
        }

        info!(
            "PDF is image-based, running OCR with {}",
            self.ocr.name()
        );
        let result = self.ocr.ocr_pdf(pdf_path)?;
        debug!(
            "OCR read {} pages in {}ms",
            result.page_count, result.processing_time_ms
        );

        Ok(ExtractedText {
            text: result.text,
            classification,
            method: ExtractionMethod::TesseractOcr,
            page_count: result.page_count,
        })
    }
}
