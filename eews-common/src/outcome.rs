//! Per-unit outcomes
//!
//! Every stage works on small independent units (one image, one filename,
//! one chart). A failed unit never aborts the batch; it is recorded as a
//! [`UnitFailure`] and handed back to the caller in the stage's report.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Category of a contained failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FailureKind {
    /// Storage or model call failed (auth, network, quota, HTTP status)
    Remote,
    /// Model output could not be parsed as a JSON object
    Parse,
    /// Source image not present in any input location
    MissingArtifact,
    /// Chart could not be drawn
    Render,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureKind::Remote => "remote",
            FailureKind::Parse => "parse",
            FailureKind::MissingArtifact => "missing-artifact",
            FailureKind::Render => "render",
        };
        f.write_str(name)
    }
}

/// One failed unit of work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    /// Image filename or chart title
    pub unit: String,
    pub kind: FailureKind,
    pub message: String,
}

impl UnitFailure {
    /// Create a failure and log it at `warn`
    pub fn record(unit: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        let failure = Self {
            unit: unit.into(),
            kind,
            message: message.into(),
        };
        tracing::warn!(
            unit = %failure.unit,
            kind = %failure.kind,
            "{}",
            failure.message
        );
        failure
    }
}

impl fmt::Display for UnitFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.kind, self.unit, self.message)
    }
}

/// Count failures of one kind
pub fn count_kind(failures: &[UnitFailure], kind: FailureKind) -> usize {
    failures.iter().filter(|f| f.kind == kind).count()
}

/// Log a closing summary of the failures accumulated by a run
pub fn log_failure_summary(stage: &str, failures: &[UnitFailure]) {
    if failures.is_empty() {
        tracing::info!("{}: no failed units", stage);
        return;
    }
    tracing::warn!(
        remote = count_kind(failures, FailureKind::Remote),
        parse = count_kind(failures, FailureKind::Parse),
        missing = count_kind(failures, FailureKind::MissingArtifact),
        render = count_kind(failures, FailureKind::Render),
        "{}: {} unit(s) failed",
        stage,
        failures.len()
    );
    for failure in failures {
        tracing::warn!("  - {}", failure);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let failure = UnitFailure::record("a.png", FailureKind::Parse, "expected object");
        assert_eq!(failure.to_string(), "[parse] a.png: expected object");
    }

    #[test]
    fn test_count_kind() {
        let failures = vec![
            UnitFailure::record("a", FailureKind::Remote, "timeout"),
            UnitFailure::record("b", FailureKind::Remote, "403"),
            UnitFailure::record("c", FailureKind::MissingArtifact, "not found"),
        ];
        assert_eq!(count_kind(&failures, FailureKind::Remote), 2);
        assert_eq!(count_kind(&failures, FailureKind::MissingArtifact), 1);
        assert_eq!(count_kind(&failures, FailureKind::Render), 0);
    }
}
