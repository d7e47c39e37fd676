//! Default LLM prompts for entity and graph annotation.

/// Default prompt for STIX entity/graph extraction. `{content}` receives the chunk verbatim.
pub const DEFAULT_STIX_PROMPT: &str = r#"You are an expert in cybersecurity data. Generate a STIX compliant structured graph interpretation and extract entities for the following text:
{content}"#;
