//! Chunk annotation backends.

mod annotator;
mod stix_annotator;
mod types;

pub use annotator::Annotator;
pub use stix_annotator::{apply_validation, render_prompt, StixAnnotator};
pub use types::{Annotation, AnnotationError};
