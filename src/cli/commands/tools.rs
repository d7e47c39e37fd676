//! External tool availability check.

use console::style;

use crate::config::Settings;
use crate::ocr::{OcrBackend, TesseractBackend};

/// Report which Poppler and Tesseract binaries can be found.
pub fn cmd_tools(settings: &Settings) -> anyhow::Result<()> {
    println!("\n{}", style("PDF / OCR Tool Status").bold());
    println!("{}", "-".repeat(50));

    let mut all_found = true;
    for (tool, available) in settings.ocr.tools.check_all() {
        let status = if available {
            style("✓ found").green()
        } else {
            all_found = false;
            style("✗ not found").red()
        };
        println!("  {:<15} {}", tool, status);
    }

    let tesseract = TesseractBackend::with_config(settings.ocr.clone());
    if !tesseract.is_available() {
        println!("\n  {}", style(tesseract.availability_hint()).dim());
    }

    println!();
    if all_found {
        println!("{} All tools available", style("✓").green());
    } else {
        println!(
            "{} Missing tools; set ocr.poppler_path / ocr.tesseract_cmd or install poppler-utils and tesseract-ocr",
            style("!").yellow()
        );
    }
    Ok(())
}
