//! The `run` command: the full extraction and annotation pipeline.

use std::path::PathBuf;

use console::style;
use indicatif::ProgressBar;
use tokio::sync::mpsc;

use crate::config::Settings;
use crate::llm::LlmClient;
use crate::ocr::TextExtractor;
use crate::services::{
    ChunkErrorPolicy, Pipeline, PipelineEvent, StixAnnotator, ValidationMode,
};

use super::super::helpers::chunk_progress_style;

/// Command-line values that take precedence over the loaded settings.
#[derive(Debug, Default)]
pub struct RunOverrides {
    pub source: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub chunk_size: Option<usize>,
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub continue_on_error: bool,
    pub validate: Option<ValidationMode>,
}

impl RunOverrides {
    /// Fold the overrides into `settings`.
    pub fn apply(self, mut settings: Settings) -> Settings {
        if let Some(source) = self.source {
            settings.source_path = Some(source);
        }
        if let Some(output) = self.output {
            settings.output_path = output;
        }
        if let Some(size) = self.chunk_size {
            settings.chunk_size = size;
        }
        if let Some(ref endpoint) = self.endpoint {
            settings.llm = settings.llm.with_endpoint(endpoint);
        }
        if let Some(ref model) = self.model {
            settings.llm = settings.llm.with_model(model);
        }
        if let Some(n) = self.max_tokens {
            settings.llm.max_tokens = n;
        }
        if self.continue_on_error {
            settings.on_chunk_error = ChunkErrorPolicy::Continue;
        }
        if let Some(mode) = self.validate {
            settings.validation = mode;
        }
        settings
    }
}

/// Extract, chunk and annotate the configured PDF.
pub async fn cmd_run(
    settings: Settings,
    overrides: RunOverrides,
    show_progress: bool,
) -> anyhow::Result<()> {
    let settings = overrides.apply(settings);
    settings.validate()?;

    let source = settings.source()?.to_path_buf();
    let output = settings.output_path.clone();

    let client = LlmClient::new(settings.llm.clone())?;
    println!(
        "{} Using {} model {} ({} max tokens)",
        style("✓").green(),
        settings.llm.provider,
        settings.llm.model,
        settings.llm.max_tokens
    );

    let pipeline = Pipeline::new(
        TextExtractor::from_config(&settings.ocr),
        settings.chunker()?,
        Box::new(StixAnnotator::new(client, settings.validation)),
        settings.on_chunk_error,
    );

    println!("{} Processing {}", style("→").cyan(), source.display());

    let (event_tx, mut event_rx) = mpsc::channel::<PipelineEvent>(100);

    // Spawn event handler for UI
    let event_handler = tokio::spawn(async move {
        let mut progress: Option<ProgressBar> = None;
        while let Some(event) = event_rx.recv().await {
            match event {
                PipelineEvent::Extracted {
                    classification,
                    page_count,
                    chars,
                    ..
                } => {
                    println!(
                        "{} PDF is {} ({} pages, {} characters)",
                        style("✓").green(),
                        classification,
                        page_count,
                        chars
                    );
                }
                PipelineEvent::Chunked { total_chunks } => {
                    if show_progress && total_chunks > 0 {
                        let bar = ProgressBar::new(total_chunks as u64);
                        bar.set_style(chunk_progress_style());
                        bar.set_message("Annotating...");
                        progress = Some(bar);
                    }
                }
                PipelineEvent::ChunkStarted { index } => {
                    if let Some(ref bar) = progress {
                        bar.set_message(format!("chunk {}", index + 1));
                    }
                }
                PipelineEvent::ChunkWritten { index, bundle } => {
                    if let Some(ref bar) = progress {
                        if let Some(summary) = bundle {
                            bar.set_message(format!(
                                "chunk {}: {} entities, {} relationships",
                                index + 1,
                                summary.entity_count(),
                                summary.relationship_count
                            ));
                        }
                        bar.inc(1);
                    }
                }
                PipelineEvent::ChunkFailed { index, error } => {
                    let line = format!("{} chunk {}: {}", style("✗").red(), index + 1, error);
                    match progress {
                        Some(ref bar) => {
                            bar.println(line);
                            bar.inc(1);
                        }
                        None => eprintln!("{}", line),
                    }
                }
                PipelineEvent::Complete { .. } => {
                    if let Some(bar) = progress.take() {
                        bar.finish_and_clear();
                    }
                }
            }
        }
        if let Some(bar) = progress.take() {
            bar.abandon();
        }
    });

    let result = pipeline.run(&source, &output, event_tx).await;

    // Wait for event handler to finish
    let _ = event_handler.await;

    let report = result?;
    if report.chunks_total == 0 {
        println!(
            "{} No text extracted; {} contains no annotations",
            style("!").yellow(),
            output.display()
        );
        return Ok(());
    }

    println!(
        "{} Wrote {} of {} annotations to {}",
        style("✓").green(),
        report.chunks_written,
        report.chunks_total,
        output.display()
    );

    if !report.is_success() {
        for failure in &report.failures {
            println!(
                "  {} chunk {}: {}",
                style("✗").red(),
                failure.index + 1,
                failure.error
            );
        }
        anyhow::bail!(
            "{} of {} chunks failed",
            report.failures.len(),
            report.chunks_total
        );
    }

    Ok(())
}
