//! Extraction-to-annotation pipeline.
//!
//! Runs `CLASSIFY -> EXTRACT -> CHUNK -> (ANNOTATE -> WRITE)* -> DONE`
//! sequentially for one document, writing one labeled block per chunk.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

use crate::chunking::Chunker;
use crate::ocr::{Classification, ExtractionError, ExtractionMethod, TextExtractor};
use crate::services::annotation::{AnnotationError, Annotator};
use crate::services::stix::BundleSummary;

/// Label line preceding every annotation in the output file.
pub const OUTPUT_LABEL: &str = "Entities and structured graph interpretation:";

/// What to do when a chunk's annotation fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ChunkErrorPolicy {
    /// Stop the run at the first failed chunk.
    #[default]
    Abort,
    /// Record the failure and move on to the next chunk.
    Continue,
}

/// Progress events emitted while the pipeline runs.
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Text extracted from the source document
    Extracted {
        classification: Classification,
        method: ExtractionMethod,
        page_count: u32,
        chars: usize,
    },
    /// Text split into chunks
    Chunked { total_chunks: usize },
    /// Chunk annotation started
    ChunkStarted { index: usize },
    /// Chunk annotated and written
    ChunkWritten {
        index: usize,
        bundle: Option<BundleSummary>,
    },
    /// Chunk annotation failed
    ChunkFailed { index: usize, error: String },
    /// Run finished
    Complete { written: usize, failed: usize },
}

/// A chunk that produced no output block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkFailure {
    pub index: usize,
    pub error: String,
}

/// Outcome of a completed run.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    pub classification: Classification,
    pub page_count: u32,
    pub chunks_total: usize,
    pub chunks_written: usize,
    pub failures: Vec<ChunkFailure>,
}

impl PipelineReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Errors that end a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("Extraction task failed: {0}")]
    ExtractionTask(#[from] tokio::task::JoinError),

    #[error("Failed to write output {}: {source}", path.display())]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Annotation failed for chunk {index}: {source}")]
    Chunk {
        index: usize,
        #[source]
        source: AnnotationError,
    },
}

/// Sequential document pipeline.
pub struct Pipeline {
    extractor: Arc<TextExtractor>,
    chunker: Chunker,
    annotator: Box<dyn Annotator>,
    policy: ChunkErrorPolicy,
}

impl Pipeline {
    pub fn new(
        extractor: TextExtractor,
        chunker: Chunker,
        annotator: Box<dyn Annotator>,
        policy: ChunkErrorPolicy,
    ) -> Self {
        Self {
            extractor: Arc::new(extractor),
            chunker,
            annotator,
            policy,
        }
    }

    /// Process `source` and write annotations to `output`.
    ///
    /// The output file is created only after extraction succeeds, and each
    /// block is flushed as soon as it is written.
    pub async fn run(
        &self,
        source: &Path,
        output: &Path,
        event_tx: mpsc::Sender<PipelineEvent>,
    ) -> Result<PipelineReport, PipelineError> {
        info!("Extracting text from {}", source.display());
        // Poppler and Tesseract run as blocking subprocesses
        let extractor = Arc::clone(&self.extractor);
        let pdf_path = source.to_path_buf();
        let extracted = tokio::task::spawn_blocking(move || extractor.extract(&pdf_path)).await??;
        let chars = extracted.text.chars().count();
        info!(
            "Extracted {} characters from {} pages ({})",
            chars, extracted.page_count, extracted.classification
        );
        let _ = event_tx
            .send(PipelineEvent::Extracted {
                classification: extracted.classification,
                method: extracted.method,
                page_count: extracted.page_count,
                chars,
            })
            .await;

        let total_chunks = self.chunker.count(&extracted.text);
        info!(
            "Split into {} chunks of up to {} characters for {}",
            total_chunks,
            self.chunker.size(),
            self.annotator.display_name()
        );
        let _ = event_tx.send(PipelineEvent::Chunked { total_chunks }).await;

        let output_err = |source| PipelineError::Output {
            path: output.to_path_buf(),
            source,
        };
        let mut writer = BufWriter::new(File::create(output).map_err(output_err)?);

        let mut written = 0;
        let mut failures = Vec::new();

        for chunk in self.chunker.chunks(&extracted.text) {
            let _ = event_tx
                .send(PipelineEvent::ChunkStarted { index: chunk.index })
                .await;

            match self.annotator.annotate(chunk.text).await {
                Ok(annotation) => {
                    write_block(&mut writer, &annotation.text)
                        .and_then(|_| writer.flush())
                        .map_err(output_err)?;
                    written += 1;
                    let _ = event_tx
                        .send(PipelineEvent::ChunkWritten {
                            index: chunk.index,
                            bundle: annotation.bundle,
                        })
                        .await;
                }
                Err(e) => {
                    let _ = event_tx
                        .send(PipelineEvent::ChunkFailed {
                            index: chunk.index,
                            error: e.to_string(),
                        })
                        .await;

                    match self.policy {
                        ChunkErrorPolicy::Abort => {
                            error!("Chunk {} failed, aborting: {}", chunk.index, e);
                            writer.flush().map_err(output_err)?;
                            return Err(PipelineError::Chunk {
                                index: chunk.index,
                                source: e,
                            });
                        }
                        ChunkErrorPolicy::Continue => {
                            warn!("Chunk {} failed, continuing: {}", chunk.index, e);
                            failures.push(ChunkFailure {
                                index: chunk.index,
                                error: e.to_string(),
                            });
                        }
                    }
                }
            }
        }

        writer.flush().map_err(output_err)?;
        info!(
            "Wrote {} annotations to {} ({} failed)",
            written,
            output.display(),
            failures.len()
        );
        let _ = event_tx
            .send(PipelineEvent::Complete {
                written,
                failed: failures.len(),
            })
            .await;

        Ok(PipelineReport {
            classification: extracted.classification,
            page_count: extracted.page_count,
            chunks_total: total_chunks,
            chunks_written: written,
            failures,
        })
    }
}

/// Write one labeled annotation block.
pub fn write_block<W: Write>(writer: &mut W, annotation: &str) -> std::io::Result<()> {
    write!(writer, "{}\n{}\n\n", OUTPUT_LABEL, annotation)
}
