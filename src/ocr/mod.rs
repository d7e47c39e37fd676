//! OCR and text extraction module.
//!
//! Extracts text from PDFs using:
//! - pdftotext (Poppler) for the native text layer
//! - pdftoppm + Tesseract OCR for image-based PDFs
//!
//! `TextExtractor` classifies the document and picks one of the two.

mod backend;
mod extractor;
mod pdftotext;
mod tesseract;
mod tools;

pub use backend::{OcrBackend, OcrConfig, OcrError, OcrResult};
pub use extractor::{
    Classification, ExtractedText, ExtractionError, ExtractionMethod, TextExtractor,
};
pub use pdftotext::{NativeExtractor, NativeText, PdfTextExtractor};
pub use tesseract::TesseractBackend;
pub use tools::{check_binary, ToolError, ToolPaths};
