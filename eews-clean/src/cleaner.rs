//! Dataset cleaning run
//!
//! **Algorithm:**
//! 1. Load the results mapping (absent file aborts the run)
//! 2. Evaluate the retention policy for every record
//! 3. Move screenshots of removed records to the deleted folder
//! 4. Archive the current results file as the backup
//! 5. Overwrite the results file with the retained records

use eews_common::outcome::UnitFailure;
use eews_common::results::{load_results, save_results};
use eews_common::{Error, ObjectStore, PipelineConfig, ResultsMapping};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::relocate::relocate_all;
use crate::retention::{evaluate, RetentionDecision};

/// Outcome of one cleaning run
#[derive(Debug, Clone, Default, Serialize)]
pub struct CleanReport {
    /// Records in the loaded mapping
    pub loaded: usize,
    pub kept: usize,
    pub removed: usize,
    /// Screenshots relocated to the deleted folder
    pub moved: usize,
    pub failures: Vec<UnitFailure>,
}

impl CleanReport {
    pub fn display_string(&self) -> String {
        format!(
            "{} records loaded, {} kept, {} removed, {} images moved, {} failed",
            self.loaded,
            self.kept,
            self.removed,
            self.moved,
            self.failures.len()
        )
    }
}

/// Records split by the retention policy
#[derive(Debug, Default)]
pub struct Partition {
    pub retained: ResultsMapping,
    /// Filenames of removed records, in mapping order
    pub removed: Vec<String>,
}

/// Split a mapping into retained records and removed filenames
pub fn partition(config: &PipelineConfig, mapping: ResultsMapping) -> Partition {
    let mut result = Partition::default();
    for (filename, record) in mapping {
        match evaluate(&config.retention, &record) {
            RetentionDecision::Keep => result.retained.insert(filename, record),
            RetentionDecision::Remove(reasons) => {
                debug!(
                    file = %filename,
                    reasons = ?reasons.iter().map(|r| r.to_string()).collect::<Vec<_>>(),
                    "Record removed"
                );
                result.removed.push(filename);
            }
        }
    }
    result
}

pub struct Cleaner<'a> {
    config: &'a PipelineConfig,
    store: &'a dyn ObjectStore,
}

impl<'a> Cleaner<'a> {
    pub fn new(config: &'a PipelineConfig, store: &'a dyn ObjectStore) -> Self {
        Self { config, store }
    }

    pub async fn run(&self) -> eews_common::Result<CleanReport> {
        let layout = &self.config.storage;
        let mapping = load_results(self.store, layout).await?.ok_or_else(|| {
            Error::NotFound(format!(
                "Results file {}",
                self.store.uri(&layout.results_path())
            ))
        })?;

        let mut report = CleanReport {
            loaded: mapping.len(),
            ..Default::default()
        };

        let Partition { retained, removed } = partition(self.config, mapping);
        report.kept = retained.len();
        report.removed = removed.len();
        info!(
            kept = report.kept,
            removed = report.removed,
            "Applied retention policy"
        );

        report.moved = relocate_all(
            self.store,
            layout,
            removed.iter().map(String::as_str),
            &mut report.failures,
        )
        .await;

        self.archive_results().await?;
        save_results(self.store, layout, &retained).await?;

        info!("{}", report.display_string());
        Ok(report)
    }

    /// Rename the current results file to the backup path, if it exists
    async fn archive_results(&self) -> eews_common::Result<()> {
        let layout = &self.config.storage;
        let (source, backup) = (layout.results_path(), layout.backup_path());
        if !self.store.exists(&source).await? {
            warn!("Results file {} vanished before archiving", self.store.uri(&source));
            return Ok(());
        }
        self.store.rename(&source, &backup).await?;
        info!("Original results archived to {}", self.store.uri(&backup));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eews_common::record::fields;
    use eews_common::AnnotationRecord;

    fn record(magnitude: &str) -> AnnotationRecord {
        let mut record = AnnotationRecord::new();
        record.insert(fields::MAGNITUDE, magnitude);
        record.insert(fields::POST_DATETIME, "2025-04-10T10:00");
        record.insert(fields::ALERT_TIME, "2025-04-10T09:58");
        record
    }

    #[test]
    fn test_partition_preserves_records() {
        let mapping: ResultsMapping = [
            ("a.png".to_string(), record("5.0")),
            ("b.png".to_string(), record("6.5")),
            ("c.png".to_string(), record("UNKNOWN")),
            ("d.png".to_string(), record("6.2")),
        ]
        .into_iter()
        .collect();

        let Partition { retained, removed } = partition(&PipelineConfig::default(), mapping);

        assert_eq!(retained.filenames().collect::<Vec<_>>(), vec!["a.png", "d.png"]);
        assert_eq!(retained.get("a.png"), Some(&record("5.0")));
        assert_eq!(removed, vec!["b.png", "c.png"]);
    }

    #[test]
    fn test_display_string() {
        let report = CleanReport {
            loaded: 4,
            kept: 2,
            removed: 2,
            moved: 1,
            failures: Vec::new(),
        };
        assert_eq!(
            report.display_string(),
            "4 records loaded, 2 kept, 2 removed, 1 images moved, 0 failed"
        );
    }
}
