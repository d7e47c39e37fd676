//! Text extraction and chunk inspection commands.

use std::path::Path;

use console::style;

use crate::chunking::Chunker;
use crate::config::Settings;
use crate::ocr::TextExtractor;

use super::super::helpers::{one_line, truncate};

/// Extract text from a PDF, or just classify it.
pub fn cmd_extract(
    settings: &Settings,
    source: &Path,
    classify_only: bool,
    output: Option<&Path>,
) -> anyhow::Result<()> {
    let extractor = TextExtractor::from_config(&settings.ocr);

    if classify_only {
        let classification = extractor.classify(source)?;
        println!("{}: {}", source.display(), classification);
        return Ok(());
    }

    let extracted = extractor.extract(source)?;
    match output {
        Some(path) => {
            std::fs::write(path, &extracted.text)?;
            println!(
                "{} Wrote {} characters ({}, {} pages) to {}",
                style("✓").green(),
                extracted.text.chars().count(),
                extracted.classification,
                extracted.page_count,
                path.display()
            );
        }
        None => print!("{}", extracted.text),
    }
    Ok(())
}

/// Print the chunk boundaries a run would use.
pub fn cmd_chunk(
    settings: &Settings,
    source: &Path,
    chunk_size: Option<usize>,
) -> anyhow::Result<()> {
    let chunker = match chunk_size {
        Some(size) => Chunker::new(size)?,
        None => settings.chunker()?,
    };

    let extracted = TextExtractor::from_config(&settings.ocr).extract(source)?;
    let total = chunker.count(&extracted.text);

    println!(
        "{} {} characters ({}) -> {} chunks of up to {}",
        style("→").cyan(),
        extracted.text.chars().count(),
        extracted.classification,
        total,
        chunker.size()
    );

    for chunk in chunker.chunks(&extracted.text) {
        println!(
            "  {:>4}  @{:<8} {:>5} chars  {}",
            chunk.index + 1,
            chunk.char_offset,
            chunk.text.chars().count(),
            style(truncate(&one_line(chunk.text), 60)).dim()
        );
    }
    Ok(())
}
