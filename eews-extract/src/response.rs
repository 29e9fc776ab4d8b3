//! Model response parsing
//!
//! Gemini sometimes wraps its JSON in a markdown code fence; the fence is
//! removed before the text is parsed as a single JSON object.

use eews_common::record::ANNOTATION_FIELDS;
use eews_common::AnnotationRecord;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("Malformed JSON: {0}")]
    Malformed(String),

    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// Trim whitespace plus an optional leading ```` ```json ```` / ```` ``` ```` and trailing ```` ``` ````
pub fn strip_code_fence(text: &str) -> &str {
    let mut cleaned = text.trim();
    if let Some(rest) = cleaned.strip_prefix("```json") {
        cleaned = rest;
    } else if let Some(rest) = cleaned.strip_prefix("```") {
        cleaned = rest;
    }
    if let Some(rest) = cleaned.strip_suffix("```") {
        cleaned = rest;
    }
    cleaned.trim()
}

/// Parse model output into an annotation record
///
/// Missing or extra keys are tolerated (older records carry a subset of the
/// field set); they are only reported at debug level.
pub fn parse_annotation(text: &str) -> Result<AnnotationRecord, ParseError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fence(text))
        .map_err(|e| ParseError::Malformed(e.to_string()))?;

    if !value.is_object() {
        return Err(ParseError::NotAnObject(json_kind(&value)));
    }

    let record: AnnotationRecord =
        serde_json::from_value(value).map_err(|e| ParseError::Malformed(e.to_string()))?;

    let missing: Vec<&str> = ANNOTATION_FIELDS
        .iter()
        .copied()
        .filter(|field| !record.contains(field))
        .collect();
    if !missing.is_empty() {
        tracing::debug!(missing = ?missing, "Annotation lacks expected fields");
    }

    Ok(record)
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
