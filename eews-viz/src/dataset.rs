//! Presentation dataset
//!
//! Rows of the results mapping after the visualization-only filters and
//! derived columns have been applied. Nothing here is written back to the
//! results file.

use chrono::NaiveDateTime;
use eews_common::record::{fields, is_valid_tag, ANNOTATION_FIELDS};
use eews_common::{AnnotationRecord, FieldValue, ResultsMapping};
use std::collections::BTreeSet;
use tracing::info;

/// Normalized on-image location, falling back to the post location
pub const LOCATION_COMBINED: &str = "location_combined";
/// Warning time bucketed into [`WARNING_TIME_LABELS`]
pub const WARNING_TIME_BINNED: &str = "warning_time_binned";

/// Alert sources kept for analysis (rows without a source are kept too)
const KEPT_ALERT_SOURCES: [&str; 3] = ["AEA", "UNKNOWN", "NOT_APPLICABLE"];

/// Location rewrites applied to `user_approximate_location_on_alert`
pub const LOCATION_ALIASES: [(&str, &str); 16] = [
    ("Near Antalya", "Antalya"),
    ("Mamak", "Ankara"),
    ("Antalya, Mugla, Izmir", "Izmir"),
    ("Izmir karsiyaka", "Izmir"),
    ("Izmir guzelbache", "Izmir"),
    ("west of Istanbul", "Istanbul"),
    ("Near Istanbul", "Istanbul"),
    ("Istanbul, Turkieh", "Istanbul"),
    ("Silivri, Istanbul", "Silivri"),
    ("Silivri, Marmara", "Silivri"),
    ("near Silivri", "Silivri"),
    ("mugla, turkey", "Mugla"),
    ("mugla fethiye", "Mugla"),
    ("eastern mediterranean sea", "eastern mediterranean"),
    ("Near the coast of Turkey", EDGE_OF_MARKED_AREA),
    ("Turkey", EDGE_OF_MARKED_AREA),
];

/// Locations too vague to place; rows carrying it are dropped
pub const EDGE_OF_MARKED_AREA: &str = "Edge of the marked area";

/// Left-closed bin edges; the first bin is unbounded below, the last above
const WARNING_TIME_EDGES: [f64; 5] = [5.0, 15.0, 30.0, 60.0, 120.0];
pub const WARNING_TIME_LABELS: [&str; 6] = [
    "<5 sec",
    "5-15 sec",
    "15-30 sec",
    "30-60 sec",
    "60-120 sec",
    ">120 sec",
];

/// One annotated screenshot
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    pub filename: String,
    pub record: AnnotationRecord,
}

impl Row {
    pub fn post_time(&self) -> Option<NaiveDateTime> {
        self.record.datetime(fields::POST_DATETIME)
    }

    /// Valid tags of one column, list values expanded
    pub fn valid_tags(&self, column: &str) -> Vec<String> {
        self.record
            .tags(column)
            .into_iter()
            .filter(|tag| is_valid_tag(tag))
            .collect()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Dataset {
    rows: Vec<Row>,
    columns: Vec<String>,
}

impl Dataset {
    /// Apply the presentation filters and derive the helper columns
    pub fn prepare(mapping: ResultsMapping) -> Self {
        let loaded = mapping.len();
        let rows: Vec<Row> = mapping
            .into_iter()
            .filter_map(|(filename, record)| {
                prepare_record(record).map(|record| Row { filename, record })
            })
            .collect();

        info!(loaded, kept = rows.len(), "Preprocessing complete");
        Self::from_rows(rows)
    }

    fn from_rows(rows: Vec<Row>) -> Self {
        let present: BTreeSet<&str> = rows.iter().flat_map(|row| row.record.keys()).collect();

        // Annotation fields in prompt order, then anything else the model
        // emitted, then the derived columns
        let mut columns: Vec<String> = ANNOTATION_FIELDS
            .iter()
            .filter(|field| present.contains(*field))
            .map(|field| field.to_string())
            .collect();
        columns.extend(
            present
                .iter()
                .copied()
                .filter(|key| {
                    !ANNOTATION_FIELDS.contains(key)
                        && *key != LOCATION_COMBINED
                        && *key != WARNING_TIME_BINNED
                })
                .map(|key| key.to_string()),
        );
        for derived in [LOCATION_COMBINED, WARNING_TIME_BINNED] {
            if present.contains(derived) {
                columns.push(derived.to_string());
            }
        }

        Self { rows, columns }
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Columns present in at least one row
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Every valid tag of a column across all rows (lists exploded)
    pub fn valid_observations(&self, column: &str) -> Vec<String> {
        self.rows.iter().flat_map(|row| row.valid_tags(column)).collect()
    }

    /// Rows with at least one valid tag in `column`
    pub fn valid_row_count(&self, column: &str) -> usize {
        self.rows
            .iter()
            .filter(|row| !row.valid_tags(column).is_empty())
            .count()
    }

    /// Numeric values of a column; non-numeric values are skipped
    pub fn numbers(&self, column: &str) -> Vec<f64> {
        self.rows
            .iter()
            .filter_map(|row| row.record.number(column))
            .collect()
    }

    /// Rows posted within `[start, end]` (both ends inclusive)
    pub fn posted_between(&self, start: NaiveDateTime, end: NaiveDateTime) -> Dataset {
        let rows = self
            .rows
            .iter()
            .filter(|row| row.post_time().map_or(false, |t| t >= start && t <= end))
            .cloned()
            .collect();
        Self::from_rows(rows)
    }
}

/// Filter and enrich one record; `None` when the row is dropped
fn prepare_record(mut record: AnnotationRecord) -> Option<AnnotationRecord> {
    if !is_kept_alert_source(record.get(fields::ALERT_SOURCE)) {
        return None;
    }

    if record.scalar(fields::PAST_EARTHQUAKE_EXPERIENCE).as_deref() == Some("YES") {
        record.insert(fields::PAST_EARTHQUAKE_EXPERIENCE, "UNKNOWN");
    }

    let location = record
        .scalar(fields::USER_LOCATION_ON_ALERT)
        .map(|raw| normalize_location(&raw).to_string());
    if let Some(location) = &location {
        if location == EDGE_OF_MARKED_AREA {
            return None;
        }
        record.insert(fields::USER_LOCATION_ON_ALERT, location.as_str());
    }

    let combined = location
        .filter(|l| l != "UNKNOWN" && l != "NOT_APPLICABLE")
        .or_else(|| record.scalar(fields::POST_LOCATION));
    if let Some(combined) = combined {
        record.insert(LOCATION_COMBINED, combined.as_str());
    }

    if let Some(seconds) = record.number(fields::WARNING_TIME_SECONDS) {
        record.insert(WARNING_TIME_BINNED, bin_warning_time(seconds));
    }

    Some(record)
}

fn is_kept_alert_source(value: Option<&FieldValue>) -> bool {
    match value {
        None => true,
        Some(FieldValue::Other(value)) if value.is_null() => true,
        Some(v) => v
            .as_scalar()
            .map_or(false, |s| KEPT_ALERT_SOURCES.contains(&s.as_str())),
    }
}

/// Apply the location alias table
pub fn normalize_location(raw: &str) -> &str {
    LOCATION_ALIASES
        .iter()
        .find(|(from, _)| *from == raw)
        .map_or(raw, |(_, to)| *to)
}

/// Label of the left-closed warning time bin containing `seconds`
pub fn bin_warning_time(seconds: f64) -> &'static str {
    let index = WARNING_TIME_EDGES
        .iter()
        .take_while(|edge| seconds >= **edge)
        .count();
    WARNING_TIME_LABELS[index]
}
