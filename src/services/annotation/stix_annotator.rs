//! STIX entity/graph annotator wrapping `LlmClient` behind the `Annotator` trait.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::llm::LlmClient;
use crate::services::stix::{validate_bundle, ValidationMode};

use super::annotator::Annotator;
use super::types::{Annotation, AnnotationError};

/// Annotator that asks an LLM for a STIX interpretation of each chunk.
pub struct StixAnnotator {
    client: LlmClient,
    validation: ValidationMode,
}

impl StixAnnotator {
    pub fn new(client: LlmClient, validation: ValidationMode) -> Self {
        Self { client, validation }
    }

    /// Build the annotation prompt for one chunk.
    pub fn build_prompt(&self, chunk: &str) -> String {
        render_prompt(self.client.config().get_prompt(), chunk)
    }
}

#[async_trait]
impl Annotator for StixAnnotator {
    fn display_name(&self) -> &str {
        "STIX Entity Extraction"
    }

    async fn annotate(&self, chunk: &str) -> Result<Annotation, AnnotationError> {
        let prompt = self.build_prompt(chunk);
        debug!("Annotating {} chars", chunk.chars().count());

        let text = self.client.complete(&prompt).await?;
        apply_validation(self.validation, text)
    }
}

/// Substitute the chunk into a prompt template.
///
/// Templates without a `{content}` placeholder get the chunk appended on its own line.
pub fn render_prompt(template: &str, chunk: &str) -> String {
    if template.contains("{content}") {
        template.replace("{content}", chunk)
    } else {
        format!("{}\n{}", template, chunk)
    }
}

/// Validate a response according to `mode`.
pub fn apply_validation(mode: ValidationMode, text: String) -> Result<Annotation, AnnotationError> {
    match mode {
        ValidationMode::Off => Ok(Annotation { text, bundle: None }),
        ValidationMode::Warn => match validate_bundle(&text) {
            Ok(summary) => Ok(Annotation {
                text,
                bundle: Some(summary),
            }),
            Err(e) => {
                warn!("Response is not a valid STIX bundle: {}", e);
                Ok(Annotation { text, bundle: None })
            }
        },
        ValidationMode::Strict => {
            let summary = validate_bundle(&text)?;
            Ok(Annotation {
                text,
                bundle: Some(summary),
            })
        }
    }
}
