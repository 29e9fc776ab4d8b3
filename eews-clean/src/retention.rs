//! Retention policy evaluation
//!
//! A record survives cleaning iff its alert magnitude lies in
//! `(min_magnitude_exclusive, max_magnitude_inclusive]` and both its post and
//! alert timestamps lie in `[window_start, window_end)`.
//!
//! Missing values fail their check: a record whose magnitude or either
//! timestamp is absent or unparseable is removed.

use chrono::NaiveDateTime;
use eews_common::config::RetentionPolicy;
use eews_common::record::fields;
use eews_common::AnnotationRecord;
use serde::Serialize;
use std::fmt;

/// Why a record failed the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RemovalReason {
    MagnitudeMissing,
    MagnitudeAboveMaximum,
    MagnitudeAtOrBelowMinimum,
    PostTimeMissing,
    PostTimeOutsideWindow,
    AlertTimeMissing,
    AlertTimeOutsideWindow,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            RemovalReason::MagnitudeMissing => "magnitude missing",
            RemovalReason::MagnitudeAboveMaximum => "magnitude above maximum",
            RemovalReason::MagnitudeAtOrBelowMinimum => "magnitude at or below minimum",
            RemovalReason::PostTimeMissing => "post time missing",
            RemovalReason::PostTimeOutsideWindow => "post time outside window",
            RemovalReason::AlertTimeMissing => "alert time missing",
            RemovalReason::AlertTimeOutsideWindow => "alert time outside window",
        };
        f.write_str(text)
    }
}

/// Derived per-record verdict (never stored)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetentionDecision {
    Keep,
    /// Every failed check, in evaluation order
    Remove(Vec<RemovalReason>),
}

impl RetentionDecision {
    pub fn is_keep(&self) -> bool {
        matches!(self, RetentionDecision::Keep)
    }
}

/// Values the policy looks at, coerced from the record
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetentionInputs {
    pub magnitude: Option<f64>,
    pub post_time: Option<NaiveDateTime>,
    pub alert_time: Option<NaiveDateTime>,
}

impl RetentionInputs {
    pub fn from_record(record: &AnnotationRecord) -> Self {
        Self {
            magnitude: record.number(fields::MAGNITUDE),
            post_time: record.datetime(fields::POST_DATETIME),
            alert_time: record.datetime(fields::ALERT_TIME),
        }
    }
}

/// Evaluate the policy for one record
pub fn evaluate(policy: &RetentionPolicy, record: &AnnotationRecord) -> RetentionDecision {
    evaluate_inputs(policy, &RetentionInputs::from_record(record))
}

pub fn evaluate_inputs(policy: &RetentionPolicy, inputs: &RetentionInputs) -> RetentionDecision {
    let mut reasons = Vec::new();

    match inputs.magnitude {
        None => reasons.push(RemovalReason::MagnitudeMissing),
        Some(m) if m > policy.max_magnitude_inclusive => {
            reasons.push(RemovalReason::MagnitudeAboveMaximum)
        }
        Some(m) if m <= policy.min_magnitude_exclusive => {
            reasons.push(RemovalReason::MagnitudeAtOrBelowMinimum)
        }
        Some(_) => {}
    }

    match inputs.post_time {
        None => reasons.push(RemovalReason::PostTimeMissing),
        Some(t) if !in_window(policy, t) => reasons.push(RemovalReason::PostTimeOutsideWindow),
        Some(_) => {}
    }

    match inputs.alert_time {
        None => reasons.push(RemovalReason::AlertTimeMissing),
        Some(t) if !in_window(policy, t) => reasons.push(RemovalReason::AlertTimeOutsideWindow),
        Some(_) => {}
    }

    if reasons.is_empty() {
        RetentionDecision::Keep
    } else {
        RetentionDecision::Remove(reasons)
    }
}

/// Closed-open window check
fn in_window(policy: &RetentionPolicy, t: NaiveDateTime) -> bool {
    t >= policy.window_start && t < policy.window_end
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn record(magnitude: &str, post: &str, alert: &str) -> AnnotationRecord {
        let mut record = AnnotationRecord::new();
        record.insert(fields::MAGNITUDE, magnitude);
        record.insert(fields::POST_DATETIME, post);
        record.insert(fields::ALERT_TIME, alert);
        record
    }

    fn inputs(magnitude: Option<f64>) -> RetentionInputs {
        RetentionInputs {
            magnitude,
            post_time: Some(at(2025, 4, 10, 10, 0)),
            alert_time: Some(at(2025, 4, 10, 9, 58)),
        }
    }

    #[test]
    fn test_scenario_valid_record_kept() {
        let decision = evaluate(
            &RetentionPolicy::default(),
            &record("5.0", "2025-04-10T10:00", "2025-04-10T09:58"),
        );
        assert_eq!(decision, RetentionDecision::Keep);
    }

    #[test]
    fn test_scenario_magnitude_above_bound_removed() {
        let decision = evaluate(
            &RetentionPolicy::default(),
            &record("6.5", "2025-04-10T10:00", "2025-04-10T09:58"),
        );
        assert_eq!(
            decision,
            RetentionDecision::Remove(vec![RemovalReason::MagnitudeAboveMaximum])
        );
    }

    #[test]
    fn test_scenario_post_after_window_removed() {
        let decision = evaluate(
            &RetentionPolicy::default(),
            &record("5.0", "2025-06-02T00:00", "2025-04-10T09:58"),
        );
        assert_eq!(
            decision,
            RetentionDecision::Remove(vec![RemovalReason::PostTimeOutsideWindow])
        );
    }

    #[test]
    fn test_magnitude_bounds() {
        let policy = RetentionPolicy::default();
        assert!(!evaluate_inputs(&policy, &inputs(Some(4.5))).is_keep());
        assert!(evaluate_inputs(&policy, &inputs(Some(4.5000001))).is_keep());
        assert!(evaluate_inputs(&policy, &inputs(Some(6.2))).is_keep());
        assert!(!evaluate_inputs(&policy, &inputs(Some(6.2000001))).is_keep());
    }

    #[test]
    fn test_missing_magnitude_removed() {
        let decision = evaluate_inputs(&RetentionPolicy::default(), &inputs(None));
        assert_eq!(
            decision,
            RetentionDecision::Remove(vec![RemovalReason::MagnitudeMissing])
        );

        let unknown = evaluate(
            &RetentionPolicy::default(),
            &record("UNKNOWN", "2025-04-10T10:00", "2025-04-10T09:58"),
        );
        assert_eq!(
            unknown,
            RetentionDecision::Remove(vec![RemovalReason::MagnitudeMissing])
        );
    }

    #[test]
    fn test_window_is_closed_open() {
        let policy = RetentionPolicy::default();
        let mut probe = inputs(Some(5.0));

        probe.post_time = Some(at(2025, 4, 1, 0, 0));
        assert!(evaluate_inputs(&policy, &probe).is_keep());

        probe.post_time = Some(at(2025, 6, 1, 0, 0));
        assert!(!evaluate_inputs(&policy, &probe).is_keep());

        probe.post_time = Some(at(2025, 3, 31, 23, 59));
        assert!(!evaluate_inputs(&policy, &probe).is_keep());
    }

    #[test]
    fn test_missing_alert_time_removed() {
        let decision = evaluate(
            &RetentionPolicy::default(),
            &record("5.0", "2025-04-10T10:00", "UNKNOWN"),
        );
        assert_eq!(
            decision,
            RetentionDecision::Remove(vec![RemovalReason::AlertTimeMissing])
        );
    }

    #[test]
    fn test_all_reasons_reported() {
        let decision = evaluate(&RetentionPolicy::default(), &AnnotationRecord::new());
        assert_eq!(
            decision,
            RetentionDecision::Remove(vec![
                RemovalReason::MagnitudeMissing,
                RemovalReason::PostTimeMissing,
                RemovalReason::AlertTimeMissing,
            ])
        );
    }

    /// Exhaustive sweep: keep iff magnitude in (4.5, 6.2] and both times in window
    #[test]
    fn test_keep_iff_all_checks_pass() {
        let policy = RetentionPolicy::default();
        let magnitudes = [None, Some(3.0), Some(4.5), Some(4.6), Some(5.5), Some(6.2), Some(6.3)];
        let times = [
            None,
            Some(at(2025, 3, 31, 23, 59)),
            Some(at(2025, 4, 1, 0, 0)),
            Some(at(2025, 5, 15, 12, 0)),
            Some(at(2025, 5, 31, 23, 59)),
            Some(at(2025, 6, 1, 0, 0)),
        ];

        for magnitude in magnitudes {
            for post_time in times {
                for alert_time in times {
                    let probe = RetentionInputs {
                        magnitude,
                        post_time,
                        alert_time,
                    };
                    let expected = magnitude.map_or(false, |m| m > 4.5 && m <= 6.2)
                        && post_time.map_or(false, |t| t >= policy.window_start && t < policy.window_end)
                        && alert_time.map_or(false, |t| t >= policy.window_start && t < policy.window_end);
                    assert_eq!(
                        evaluate_inputs(&policy, &probe).is_keep(),
                        expected,
                        "{:?}",
                        probe
                    );
                }
            }
        }
    }
}
