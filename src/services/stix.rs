//! Validation of model responses as STIX 2.1 bundles.
//!
//! The prompt asks for STIX but nothing forces the model to comply, so the
//! response is checked structurally: a bundle of typed objects with
//! well-formed ids, and relationships that name both ends.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Errors from bundle validation.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("response contains no JSON object")]
    NoJson,

    #[error("response JSON is malformed: {0}")]
    Malformed(String),

    #[error("top-level object is not a STIX bundle (type = {0:?})")]
    NotABundle(Option<String>),

    #[error("bundle has no objects array")]
    MissingObjects,

    #[error("object {index} is invalid: {reason}")]
    InvalidObject { index: usize, reason: String },
}

/// What a valid bundle contains.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleSummary {
    pub object_count: usize,
    pub relationship_count: usize,
    /// Object count per STIX type, relationships included.
    pub types: BTreeMap<String, usize>,
}

impl BundleSummary {
    /// Objects that are not relationships.
    pub fn entity_count(&self) -> usize {
        self.object_count - self.relationship_count
    }
}

/// Validation strictness for annotations.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ValidationMode {
    /// Keep the response as-is.
    Off,
    /// Validate and log problems, keep the response.
    #[default]
    Warn,
    /// Treat an invalid response as a failed chunk.
    Strict,
}

/// Validate a model response as a STIX bundle.
pub fn validate_bundle(response: &str) -> Result<BundleSummary, ValidationError> {
    let payload = extract_json_payload(response).ok_or(ValidationError::NoJson)?;
    let value: Value =
        serde_json::from_str(payload).map_err(|e| ValidationError::Malformed(e.to_string()))?;

    let bundle_type = value.get("type").and_then(Value::as_str);
    if bundle_type != Some("bundle") {
        return Err(ValidationError::NotABundle(bundle_type.map(str::to_string)));
    }

    let objects = value
        .get("objects")
        .and_then(Value::as_array)
        .ok_or(ValidationError::MissingObjects)?;

    let mut summary = BundleSummary::default();
    for (index, object) in objects.iter().enumerate() {
        let object_type = check_object(object)
            .map_err(|reason| ValidationError::InvalidObject { index, reason })?;
        if object_type == "relationship" {
            summary.relationship_count += 1;
        }
        *summary.types.entry(object_type.to_string()).or_default() += 1;
        summary.object_count += 1;
    }

    Ok(summary)
}

/// Check one bundle member, returning its type.
fn check_object(object: &Value) -> Result<&str, String> {
    let object_type = object
        .get("type")
        .and_then(Value::as_str)
        .filter(|t| !t.is_empty())
        .ok_or_else(|| "missing type".to_string())?;

    let id = object
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("{} has no id", object_type))?;
    if !is_identifier_for(id, object_type) {
        return Err(format!("id {:?} is not of the form {}--<uuid>", id, object_type));
    }

    if object_type == "relationship" {
        for field in ["source_ref", "target_ref"] {
            if object.get(field).and_then(Value::as_str).is_none() {
                return Err(format!("relationship {} has no {}", id, field));
            }
        }
    }

    Ok(object_type)
}

/// STIX identifiers are `<object-type>--<uuid>`.
fn is_identifier_for(id: &str, object_type: &str) -> bool {
    match id.split_once("--") {
        Some((prefix, suffix)) => prefix == object_type && !suffix.is_empty(),
        None => false,
    }
}

/// Locate the JSON document in a free-text response.
///
/// Prefers a fenced ```json block; otherwise takes the span from the first
/// `{` to the last `}`.
pub fn extract_json_payload(response: &str) -> Option<&str> {
    if let Some(start) = response.find("```json") {
        let body = &response[start + "```json".len()..];
        if let Some(end) = body.find("```") {
            return Some(body[..end].trim());
        }
    }

    let start = response.find('{')?;
    let end = response.rfind('}')?;
    (end > start).then(|| &response[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"{
        "type": "bundle",
        "id": "bundle--5d0092c5-5f74-4287-9642-33f4c354e56d",
        "objects": [
            {"type": "threat-actor", "id": "threat-actor--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f", "name": "APT actors"},
            {"type": "vulnerability", "id": "vulnerability--0c7b5b88-8ff7-4a4d-aa9d-feb398cd0061", "name": "CVE-2022-47966"},
            {"type": "relationship", "id": "relationship--44298a74-ba52-4f0c-87a3-1824e67d7fad",
             "relationship_type": "targets",
             "source_ref": "threat-actor--8e2e2d2b-17d4-4cbf-938f-98ee46b3cd3f",
             "target_ref": "vulnerability--0c7b5b88-8ff7-4a4d-aa9d-feb398cd0061"}
        ]
    }"#;

    #[test]
    fn test_valid_bundle() {
        let summary = validate_bundle(BUNDLE).unwrap();
        assert_eq!(summary.object_count, 3);
        assert_eq!(summary.relationship_count, 1);
        assert_eq!(summary.entity_count(), 2);
        assert_eq!(summary.types.get("vulnerability"), Some(&1));
    }

    #[test]
    fn test_fenced_bundle_with_prose() {
        let response = format!(
            "Here is the STIX interpretation:\n\n```json\n{}\n```\n\nEntities: APT actors, CVE-2022-47966",
            BUNDLE
        );
        assert_eq!(validate_bundle(&response).unwrap().object_count, 3);
    }

    #[test]
    fn test_plain_text_has_no_json() {
        assert_eq!(
            validate_bundle("Entities: Fortinet, Zoho ManageEngine"),
            Err(ValidationError::NoJson)
        );
    }

    #[test]
    fn test_non_bundle_json() {
        let err = validate_bundle(r#"{"type": "indicator", "id": "indicator--1"}"#).unwrap_err();
        assert_eq!(err, ValidationError::NotABundle(Some("indicator".to_string())));
    }

    #[test]
    fn test_truncated_json_is_malformed() {
        let truncated = &BUNDLE[..BUNDLE.len() / 2];
        let response = format!("{}}}", truncated);
        assert!(matches!(
            validate_bundle(&response),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_object_without_type() {
        let err = validate_bundle(r#"{"type": "bundle", "objects": [{"id": "x--1"}]}"#).unwrap_err();
        assert!(matches!(err, ValidationError::InvalidObject { index: 0, .. }));
    }

    #[test]
    fn test_id_must_match_type() {
        let err = validate_bundle(
            r#"{"type": "bundle", "objects": [{"type": "malware", "id": "tool--1234"}]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidObject { reason, .. } if reason.contains("malware--")));
    }

    #[test]
    fn test_relationship_needs_both_refs() {
        let err = validate_bundle(
            r#"{"type": "bundle", "objects": [
                {"type": "relationship", "id": "relationship--1", "source_ref": "malware--1"}
            ]}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ValidationError::InvalidObject { reason, .. } if reason.contains("target_ref")));
    }

    #[test]
    fn test_missing_objects() {
        assert_eq!(
            validate_bundle(r#"{"type": "bundle"}"#),
            Err(ValidationError::MissingObjects)
        );
    }
}
