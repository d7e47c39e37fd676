//! OCR backend abstraction.
//!
//! The pipeline only needs "PDF in, recognized text out"; backends hide how
//! pages are rasterized and which engine reads them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::tools::{ToolError, ToolPaths};

/// Errors from OCR backends.
#[derive(Debug, Error)]
pub enum OcrError {
    #[error("Backend not available: {0}")]
    BackendNotAvailable(String),

    #[error("OCR failed: {0}")]
    OcrFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ToolError> for OcrError {
    fn from(err: ToolError) -> Self {
        match err {
            ToolError::NotFound(tool) => OcrError::BackendNotAvailable(format!("{} not found", tool)),
            ToolError::Failed(msg) => OcrError::OcrFailed(msg),
            ToolError::Io(e) => OcrError::Io(e),
        }
    }
}

/// Result of OCR processing.
#[derive(Debug, Clone)]
pub struct OcrResult {
    /// Recognized text, pages concatenated in order.
    pub text: String,
    /// Number of page images processed.
    pub page_count: u32,
    /// Processing time in milliseconds.
    pub processing_time_ms: u64,
}

/// Trait for OCR backends.
pub trait OcrBackend: Send + Sync {
    /// Short backend name for logs and tool status output.
    fn name(&self) -> &str;

    /// Check if this backend is available (dependencies installed).
    fn is_available(&self) -> bool;

    /// Get a description of what's needed to make this backend available.
    fn availability_hint(&self) -> String;

    /// Rasterize every page of a PDF and OCR each one in page order.
    ///
    /// A failure on any page aborts the whole document.
    fn ocr_pdf(&self, pdf_path: &Path) -> Result<OcrResult, OcrError>;
}

/// Configuration for the OCR toolchain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Language for OCR (e.g., "eng", "chi_sim").
    #[serde(default = "default_language")]
    pub language: String,
    /// Rasterization resolution. `None` keeps the renderer's default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dpi: Option<u32>,
    /// Locations of the external binaries.
    #[serde(flatten)]
    pub tools: ToolPaths,
}

fn default_language() -> String {
    "eng".to_string()
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            language: default_language(),
            dpi: None,
            tools: ToolPaths::default(),
        }
    }
}
