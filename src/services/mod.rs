//! Service layer: annotation backends, response validation and the pipeline driver.

pub mod annotation;
pub mod pipeline;
pub mod stix;

pub use annotation::{Annotation, AnnotationError, Annotator, StixAnnotator};
pub use pipeline::{
    ChunkErrorPolicy, ChunkFailure, Pipeline, PipelineError, PipelineEvent, PipelineReport,
    OUTPUT_LABEL,
};
pub use stix::{validate_bundle, BundleSummary, ValidationError, ValidationMode};
