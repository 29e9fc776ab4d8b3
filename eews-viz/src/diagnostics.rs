//! Data sanity checks
//!
//! Findings are logged and returned; they are never persisted.

use eews_common::record::fields;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

use crate::dataset::{Dataset, Row};

const LOW_MAGNITUDE_MAX: f64 = 5.0;
const HIGH_MAGNITUDE_MIN: f64 = 6.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticCheck {
    /// Magnitude ≤ 5 or ≥ 6.2
    MagnitudeOutOfRange,
    /// Strong shaking yet the alert arrived before it
    StrongBeforeShaking,
}

impl fmt::Display for DiagnosticCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticCheck::MagnitudeOutOfRange => f.write_str("magnitude <=5 or >=6.2"),
            DiagnosticCheck::StrongBeforeShaking => f.write_str("strong shaking before alert"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Finding {
    pub check: DiagnosticCheck,
    pub filename: String,
    pub post_time: Option<String>,
    pub magnitude: Option<f64>,
    pub reasoning: Option<String>,
}

impl Finding {
    fn from_row(check: DiagnosticCheck, row: &Row) -> Self {
        Self {
            check,
            filename: row.filename.clone(),
            post_time: row.record.scalar(fields::POST_DATETIME),
            magnitude: row.record.number(fields::MAGNITUDE),
            reasoning: row.record.scalar(fields::REASONING),
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} posted {} magnitude {}: {}",
            self.check,
            self.filename,
            self.post_time.as_deref().unwrap_or("-"),
            self.magnitude.map_or("-".to_string(), |m| m.to_string()),
            self.reasoning.as_deref().unwrap_or("")
        )
    }
}

/// Run both checks over the prepared dataset
pub fn run_diagnostics(dataset: &Dataset) -> Vec<Finding> {
    let mut findings: Vec<Finding> = dataset
        .rows()
        .iter()
        .filter(|row| {
            row.record
                .number(fields::MAGNITUDE)
                .map_or(false, |m| m <= LOW_MAGNITUDE_MAX || m >= HIGH_MAGNITUDE_MIN)
        })
        .map(|row| Finding::from_row(DiagnosticCheck::MagnitudeOutOfRange, row))
        .collect();

    findings.extend(
        dataset
            .rows()
            .iter()
            .filter(|row| {
                row.record.scalar(fields::SHAKING_LEVEL).as_deref() == Some("STRONG")
                    && row.record.scalar(fields::ALERT_ARRIVAL).as_deref() == Some("BEFORE_SHAKING")
            })
            .map(|row| Finding::from_row(DiagnosticCheck::StrongBeforeShaking, row)),
    );

    if findings.is_empty() {
        info!("Data sanity checks: no findings");
    }
    for finding in &findings {
        warn!("{}", finding);
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use eews_common::{AnnotationRecord, FieldValue, ResultsMapping};

    fn row(name: &str, pairs: &[(&str, &str)]) -> (String, AnnotationRecord) {
        (
            name.to_string(),
            pairs.iter().map(|(k, v)| (k.to_string(), FieldValue::from(*v))).collect(),
        )
    }

    #[test]
    fn test_magnitude_check_bounds() {
        let mapping: ResultsMapping = vec![
            row("five.png", &[("magnitude_on_alert_screenshot", "5.0")]),
            row("mid.png", &[("magnitude_on_alert_screenshot", "5.5")]),
            row("high.png", &[("magnitude_on_alert_screenshot", "6.2")]),
            row("blank.png", &[("magnitude_on_alert_screenshot", "UNKNOWN")]),
        ]
        .into_iter()
        .collect();

        let findings = run_diagnostics(&Dataset::prepare(mapping));
        let names: Vec<&str> = findings.iter().map(|f| f.filename.as_str()).collect();

        assert_eq!(names, vec!["five.png", "high.png"]);
        assert!(findings.iter().all(|f| f.check == DiagnosticCheck::MagnitudeOutOfRange));
    }

    #[test]
    fn test_strong_before_shaking() {
        let mapping: ResultsMapping = vec![
            row(
                "a.png",
                &[
                    ("shaking_level", "STRONG"),
                    ("alert_arrival_wrt_shaking", "BEFORE_SHAKING"),
                    ("reasoning", "Alert came first."),
                    ("post_datetime", "2025-04-23T12:55"),
                ],
            ),
            row(
                "b.png",
                &[("shaking_level", "STRONG"), ("alert_arrival_wrt_shaking", "AFTER_SHAKING")],
            ),
        ]
        .into_iter()
        .collect();

        let findings = run_diagnostics(&Dataset::prepare(mapping));

        assert_eq!(
            findings,
            vec![Finding {
                check: DiagnosticCheck::StrongBeforeShaking,
                filename: "a.png".to_string(),
                post_time: Some("2025-04-23T12:55".to_string()),
                magnitude: None,
                reasoning: Some("Alert came first.".to_string()),
            }]
        );
    }
}
