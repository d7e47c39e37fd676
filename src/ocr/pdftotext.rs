//! Native PDF text extraction using Poppler's `pdfinfo` and `pdftotext`.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use super::extractor::ExtractionError;
use super::tools::{handle_cmd_output, ToolPaths};

/// Text read from a PDF's embedded text layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeText {
    pub text: String,
    pub page_count: u32,
}

/// Source of native (non-OCR) PDF text.
pub trait NativeExtractor: Send + Sync {
    /// Extract every page's text layer, concatenated in page order with no separator.
    fn extract_text(&self, pdf_path: &Path) -> Result<NativeText, ExtractionError>;
}

/// Native extractor backed by Poppler.
#[derive(Debug, Clone, Default)]
pub struct PdfTextExtractor {
    tools: ToolPaths,
}

impl PdfTextExtractor {
    pub fn new(tools: ToolPaths) -> Self {
        Self { tools }
    }

    /// Get the page count of a PDF.
    ///
    /// `pdfinfo` rejecting the file is how unreadable or corrupt PDFs surface.
    pub fn page_count(&self, pdf_path: &Path) -> Result<u32, ExtractionError> {
        let output = Command::new(self.tools.poppler("pdfinfo"))
            .arg(pdf_path)
            .output();

        let stdout = handle_cmd_output(output, "pdfinfo (install poppler-utils)", "pdfinfo failed")
            .map_err(|e| ExtractionError::from_tool(e, pdf_path))?;

        parse_page_count(&stdout).ok_or_else(|| {
            ExtractionError::InvalidDocument(format!(
                "{}: pdfinfo reported no page count",
                pdf_path.display()
            ))
        })
    }

    /// Run pdftotext on a single page of a PDF file.
    pub fn extract_page(&self, pdf_path: &Path, page: u32) -> Result<String, ExtractionError> {
        let page_str = page.to_string();
        let output = Command::new(self.tools.poppler("pdftotext"))
            .args(["-enc", "UTF-8", "-f", &page_str, "-l", &page_str])
            .arg(pdf_path)
            .arg("-") // Output to stdout
            .output();

        let text = handle_cmd_output(
            output,
            "pdftotext (install poppler-utils)",
            &format!("pdftotext failed on page {}", page),
        )
        .map_err(|e| ExtractionError::from_tool(e, pdf_path))?;

        Ok(strip_page_break(text))
    }
}

impl NativeExtractor for PdfTextExtractor {
    fn extract_text(&self, pdf_path: &Path) -> Result<NativeText, ExtractionError> {
        if !pdf_path.is_file() {
            return Err(ExtractionError::NotFound(pdf_path.to_path_buf()));
        }

        let page_count = self.page_count(pdf_path)?;
        debug!("{}: {} pages", pdf_path.display(), page_count);

        let mut text = String::new();
        for page in 1..=page_count {
            text.push_str(&self.extract_page(pdf_path, page)?);
        }

        Ok(NativeText { text, page_count })
    }
}

/// Pull the `Pages:` value out of `pdfinfo` output.
fn parse_page_count(pdfinfo: &str) -> Option<u32> {
    pdfinfo
        .lines()
        .find(|line| line.starts_with("Pages:"))
        .and_then(|line| line.split_whitespace().nth(1))
        .and_then(|s| s.parse().ok())
}

/// pdftotext terminates every page with a form feed.
fn strip_page_break(mut text: String) -> String {
    if text.ends_with('\u{c}') {
        text.pop();
    }
    text
}
