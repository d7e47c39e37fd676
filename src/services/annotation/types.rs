//! Annotation output and error types.

use thiserror::Error;

use crate::llm::LlmError;
use crate::services::stix::{BundleSummary, ValidationError};

/// One chunk's annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    /// Raw response text, written to the output as-is.
    pub text: String,
    /// Present when the response validated as a STIX bundle.
    pub bundle: Option<BundleSummary>,
}

/// Errors from annotation backends.
#[derive(Debug, Error)]
pub enum AnnotationError {
    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error("Invalid STIX response: {0}")]
    Validation(#[from] ValidationError),
}
