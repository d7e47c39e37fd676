//! stixtract - extract text from PDFs and annotate it with STIX entity graphs.
//!
//! Native PDF text is read with Poppler; image-based PDFs fall back to
//! Tesseract OCR. The text is split into fixed-size chunks, each chunk is sent
//! to an LLM completion endpoint, and the responses are written in order to a
//! single output file.

pub mod chunking;
pub mod cli;
pub mod config;
pub mod llm;
pub mod ocr;
pub mod services;

pub use chunking::{Chunk, Chunker, DEFAULT_CHUNK_SIZE};
pub use config::{LoadOptions, Settings};
pub use services::{Pipeline, PipelineEvent, PipelineReport};
