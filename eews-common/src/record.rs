//! Annotation record model
//!
//! The results file is a single JSON object: source image filename →
//! annotation record. A record is a flat mapping of the fixed survey fields
//! (see [`ANNOTATION_FIELDS`]) to values that are either one tag, an ordered
//! list of tags, or whatever else the model emitted (kept verbatim).

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::btree_map;
use std::collections::BTreeMap;

use crate::Result;

/// Field names referenced directly by the pipeline stages
pub mod fields {
    pub const USERNAME: &str = "username";
    pub const POST_DATETIME: &str = "post_datetime";
    pub const POST_LOCATION: &str = "post_location";
    pub const WARNING_TIME_SECONDS: &str = "warning_time_seconds";
    pub const ALERT_TIME: &str = "alert_time";
    pub const MAGNITUDE: &str = "magnitude_on_alert_screenshot";
    pub const DISTANCE: &str = "distance_on_alert_screenshot_ml";
    pub const ALERT_LANGUAGE: &str = "alert_language";
    pub const USER_LOCATION_ON_ALERT: &str = "user_approximate_location_on_alert";
    pub const ALERT_SOURCE: &str = "alert_source";
    pub const PAST_EARTHQUAKE_EXPERIENCE: &str = "user's_past_earthquake_experience";
    pub const SHAKING_LEVEL: &str = "shaking_level";
    pub const SHAKING_INTENSITY_MMI: &str = "shaking_intensity_mmi";
    pub const ALERT_ARRIVAL: &str = "alert_arrival_wrt_shaking";
    pub const ALERT_INFO_RECALL: &str = "alert_info_recall";
    pub const REASONING: &str = "reasoning";
}

/// The fixed field set the extraction prompt asks the model to return
pub const ANNOTATION_FIELDS: [&str; 40] = [
    "username",
    "post_datetime",
    "post_location",
    "warning_time_seconds",
    "with_alert_screenshot",
    "alert_time",
    "magnitude_on_alert_screenshot",
    "distance_on_alert_screenshot_ml",
    "alert_language",
    "alert_screenshot_with_contour",
    "user_approximate_location_on_alert",
    "alert_type",
    "alert_source",
    "reply_sentiment",
    "felt_shaking",
    "alert_mode",
    "post_alert_action",
    "users_sentiment",
    "users_emotion",
    "helpfulness",
    "system_improvement",
    "alert_arrival_wrt_shaking",
    "shaking_level",
    "shaking_intensity_mmi",
    "alert_received_by_others",
    "indoor_vs_outdoor",
    "user's_accompany",
    "first_earthquake_alert_experience",
    "user's_past_earthquake_experience",
    "past_earthquake_damage_experience",
    "user's_gender",
    "alert_info_recall",
    "aea_info_accuracy",
    "technical_issues_with_alert",
    "alert_info_clearance",
    "reason_for_taking_no_action",
    "future_trust_level",
    "helpfulness_reason",
    "aea_vs_others",
    "reasoning",
];

/// Placeholder tags that carry no information
pub const PLACEHOLDER_TAGS: [&str; 4] = ["UNKNOWN", "NOT_APPLICABLE", "nan", "None"];

/// True for a tag that counts as an observation
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.trim().is_empty() && !PLACEHOLDER_TAGS.contains(&tag)
}

/// One annotation value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// One enumerated tag or free text
    Single(String),
    /// Ordered list of enumerated tags
    Multiple(Vec<String>),
    /// Numbers, nulls or any other JSON the model produced
    Other(serde_json::Value),
}

impl FieldValue {
    /// String form of a scalar value; `None` for null and lists
    pub fn as_scalar(&self) -> Option<String> {
        match self {
            FieldValue::Single(s) => Some(s.clone()),
            FieldValue::Multiple(_) => None,
            FieldValue::Other(value) => json_scalar_text(value),
        }
    }

    /// Numeric coercion: non-numeric values become missing
    pub fn as_number(&self) -> Option<f64> {
        let number = match self {
            FieldValue::Single(s) => s.trim().parse::<f64>().ok(),
            FieldValue::Other(serde_json::Value::Number(n)) => n.as_f64(),
            _ => None,
        };
        number.filter(|n| n.is_finite())
    }

    /// Expand into individual tags (one per list element)
    pub fn tags(&self) -> Vec<String> {
        match self {
            FieldValue::Single(s) => vec![s.clone()],
            FieldValue::Multiple(items) => items.clone(),
            FieldValue::Other(serde_json::Value::Array(items)) => {
                items.iter().filter_map(json_scalar_text).collect()
            }
            FieldValue::Other(value) => json_scalar_text(value).into_iter().collect(),
        }
    }

    pub fn is_list(&self) -> bool {
        matches!(
            self,
            FieldValue::Multiple(_) | FieldValue::Other(serde_json::Value::Array(_))
        )
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Single(value.to_string())
    }
}

impl From<Vec<&str>> for FieldValue {
    fn from(values: Vec<&str>) -> Self {
        FieldValue::Multiple(values.into_iter().map(str::to_string).collect())
    }
}

fn json_scalar_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Coerce an annotation datetime to a timestamp; unparseable → `None`
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    const FORMATS: [&str; 6] = [
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
    ];

    let text = text.trim();
    if let Some(parsed) = FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(parsed);
    }
    if let Ok(with_offset) = DateTime::parse_from_rfc3339(text) {
        return Some(with_offset.naive_utc());
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

/// Annotation for one source image
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnnotationRecord {
    fields: BTreeMap<String, FieldValue>,
}

impl AnnotationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn scalar(&self, key: &str) -> Option<String> {
        self.get(key).and_then(FieldValue::as_scalar)
    }

    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(FieldValue::as_number)
    }

    pub fn datetime(&self, key: &str) -> Option<NaiveDateTime> {
        self.scalar(key).as_deref().and_then(parse_timestamp)
    }

    /// Tags of a field (empty when absent)
    pub fn tags(&self, key: &str) -> Vec<String> {
        self.get(key).map(FieldValue::tags).unwrap_or_default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl FromIterator<(String, FieldValue)> for AnnotationRecord {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Filename → annotation record; the persisted dataset of record
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultsMapping {
    records: BTreeMap<String, AnnotationRecord>,
}

impl ResultsMapping {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Pretty-printed JSON, two-space indent
    pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn contains(&self, filename: &str) -> bool {
        self.records.contains_key(filename)
    }

    pub fn get(&self, filename: &str) -> Option<&AnnotationRecord> {
        self.records.get(filename)
    }

    pub fn insert(&mut self, filename: impl Into<String>, record: AnnotationRecord) {
        self.records.insert(filename.into(), record);
    }

    pub fn remove(&mut self, filename: &str) -> Option<AnnotationRecord> {
        self.records.remove(filename)
    }

    pub fn filenames(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, AnnotationRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl IntoIterator for ResultsMapping {
    type Item = (String, AnnotationRecord);
    type IntoIter = btree_map::IntoIter<String, AnnotationRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}

impl FromIterator<(String, AnnotationRecord)> for ResultsMapping {
    fn from_iter<I: IntoIterator<Item = (String, AnnotationRecord)>>(iter: I) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_field_value_variants_from_json() {
        let record: AnnotationRecord = serde_json::from_value(json!({
            "alert_type": "BE_AWARE_NOTIFICATION",
            "alert_info_recall": ["ESTIMATED_MAGNITUDE", "ALERT_SOURCE"],
            "magnitude_on_alert_screenshot": 5.3,
            "alert_time": null
        }))
        .unwrap();

        assert_eq!(
            record.get("alert_type"),
            Some(&FieldValue::Single("BE_AWARE_NOTIFICATION".to_string()))
        );
        assert!(record.get("alert_info_recall").unwrap().is_list());
        assert_eq!(
            record.tags("alert_info_recall"),
            vec!["ESTIMATED_MAGNITUDE", "ALERT_SOURCE"]
        );
        assert_eq!(record.number(fields::MAGNITUDE), Some(5.3));
        assert_eq!(record.scalar(fields::ALERT_TIME), None);
        assert!(record.tags(fields::ALERT_TIME).is_empty());
    }

    #[test]
    fn test_number_coercion() {
        assert_eq!(FieldValue::from("5.0").as_number(), Some(5.0));
        assert_eq!(FieldValue::from(" 4.6 ").as_number(), Some(4.6));
        assert_eq!(FieldValue::from("UNKNOWN").as_number(), None);
        assert_eq!(FieldValue::from("NaN").as_number(), None);
        assert_eq!(FieldValue::from(vec!["5.0"]).as_number(), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = NaiveDate::from_ymd_opt(2025, 4, 10)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        assert_eq!(parse_timestamp("2025-04-10T10:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-04-10T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-04-10 10:00"), Some(expected));
        assert_eq!(parse_timestamp("2025-04-10T10:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2025-04-10T13:00:00+03:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2025-04-10"),
            NaiveDate::from_ymd_opt(2025, 4, 10).unwrap().and_hms_opt(0, 0, 0)
        );
        assert_eq!(parse_timestamp("UNKNOWN"), None);
        assert_eq!(parse_timestamp("2025-13-01T00:00"), None);
    }

    #[test]
    fn test_is_valid_tag() {
        assert!(is_valid_tag("YES"));
        assert!(!is_valid_tag("UNKNOWN"));
        assert!(!is_valid_tag("NOT_APPLICABLE"));
        assert!(!is_valid_tag("nan"));
        assert!(!is_valid_tag("  "));
    }

    #[test]
    fn test_mapping_json_round_trip() {
        let mut record = AnnotationRecord::new();
        record.insert("username", "@someone");
        record.insert("alert_info_recall", vec!["ESTIMATED_DISTANCE"]);
        record.insert("magnitude_on_alert_screenshot", FieldValue::Other(json!(5.1)));

        let mut mapping = ResultsMapping::new();
        mapping.insert("shot.png", record);

        let bytes = mapping.to_json_bytes().unwrap();
        let reloaded = ResultsMapping::from_json_bytes(&bytes).unwrap();
        assert_eq!(reloaded, mapping);
    }

    #[test]
    fn test_mapping_rejects_non_object() {
        assert!(ResultsMapping::from_json_bytes(b"[1, 2]").is_err());
    }
}
