//! Tesseract OCR backend implementation.
//!
//! Rasterizes PDF pages with `pdftoppm` and reads each image with the
//! Tesseract command-line tool.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Instant;

use tempfile::TempDir;
use tracing::debug;

use super::backend::{OcrBackend, OcrConfig, OcrError, OcrResult};
use super::tools::{check_binary, check_cmd_status, handle_cmd_output};

/// Tesseract OCR backend.
pub struct TesseractBackend {
    config: OcrConfig,
}

impl TesseractBackend {
    /// Create a new Tesseract backend with custom configuration.
    pub fn with_config(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Run Tesseract on an image file.
    fn run_tesseract(&self, image_path: &Path) -> Result<String, OcrError> {
        let output = Command::new(self.config.tools.tesseract())
            .arg(image_path)
            .arg("stdout")
            .args(["-l", &self.config.language])
            .output();

        Ok(handle_cmd_output(
            output,
            "tesseract (install tesseract-ocr)",
            "tesseract failed",
        )?)
    }

    /// Convert every page of a PDF to PNG images in `output_dir`.
    fn render_pages(&self, pdf_path: &Path, output_dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
        let mut cmd = Command::new(self.config.tools.poppler("pdftoppm"));
        cmd.arg("-png");
        if let Some(dpi) = self.config.dpi {
            cmd.args(["-r", &dpi.to_string()]);
        }
        let status = cmd.arg(pdf_path).arg(output_dir.join("page")).status();

        check_cmd_status(
            status,
            "pdftoppm (install poppler-utils)",
            "pdftoppm failed to convert PDF",
        )?;

        let images = find_page_images(output_dir)?;
        if images.is_empty() {
            return Err(OcrError::OcrFailed(
                "No images generated from PDF".to_string(),
            ));
        }
        Ok(images)
    }
}

impl OcrBackend for TesseractBackend {
    fn name(&self) -> &str {
        "tesseract"
    }

    fn is_available(&self) -> bool {
        check_binary(&self.config.tools.tesseract())
            && check_binary(&self.config.tools.poppler("pdftoppm"))
    }

    fn availability_hint(&self) -> String {
        if !check_binary(&self.config.tools.tesseract()) {
            "Tesseract not installed. Install with: apt install tesseract-ocr".to_string()
        } else if !check_binary(&self.config.tools.poppler("pdftoppm")) {
            "pdftoppm not installed. Install with: apt install poppler-utils".to_string()
        } else {
            "Tesseract is available".to_string()
        }
    }

    fn ocr_pdf(&self, pdf_path: &Path) -> Result<OcrResult, OcrError> {
        let start = Instant::now();

        let temp_dir = TempDir::new()?;
        let images = self.render_pages(pdf_path, temp_dir.path())?;

        let mut text = String::new();
        for (i, image_path) in images.iter().enumerate() {
            debug!("OCR page {}/{}", i + 1, images.len());
            text.push_str(&self.run_tesseract(image_path)?);
        }

        Ok(OcrResult {
            text,
            page_count: images.len() as u32,
            processing_time_ms: start.elapsed().as_millis() as u64,
        })
    }
}

/// Collect rendered page images in page order.
///
/// pdftoppm zero-pads page numbers to a uniform width within one run
/// (page-01.png ... page-12.png), so a lexical sort is page order.
fn find_page_images(dir: &Path) -> Result<Vec<PathBuf>, OcrError> {
    let mut images: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "png"))
        .collect();
    images.sort();
    Ok(images)
}
