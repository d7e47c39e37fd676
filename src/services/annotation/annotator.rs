//! Annotator trait shared by annotation backends.

use async_trait::async_trait;

use super::types::{Annotation, AnnotationError};

/// A backend that turns one chunk of text into an annotation.
///
/// The pipeline drives any implementation identically; `StixAnnotator` is
/// the LLM-backed one.
#[async_trait]
pub trait Annotator: Send + Sync {
    /// Human-readable name for CLI progress output.
    fn display_name(&self) -> &str;

    /// Annotate a single chunk.
    async fn annotate(&self, chunk: &str) -> Result<Annotation, AnnotationError>;
}
