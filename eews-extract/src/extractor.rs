//! Annotation extraction run
//!
//! **Algorithm:**
//! 1. Load the existing results mapping (empty if absent or unreadable)
//! 2. List screenshots under both input folders, in order
//! 3. For each `.png` whose filename has no record: call the model, parse, store
//! 4. Pause for the configured delay after every model call
//! 5. Persist the full mapping once at the end
//!
//! A failed image is recorded and skipped; it stays eligible for the next run.

use eews_common::config::base_name;
use eews_common::outcome::{FailureKind, UnitFailure};
use eews_common::results::{load_results, save_results};
use eews_common::{ObjectStore, PipelineConfig, ResultsMapping};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::model::AnnotationModel;
use crate::prompt::FewShotPrompt;
use crate::response::parse_annotation;

/// A screenshot found in one of the input folders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredImage {
    /// Bucket-relative object path
    pub path: String,
    /// Record key
    pub filename: String,
}

/// Outcome of one extraction run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExtractionReport {
    /// Screenshots found across both input folders
    pub discovered: usize,
    /// Screenshots skipped because a record already exists
    pub skipped_existing: usize,
    /// New records produced by this run
    pub annotated: usize,
    /// Records in the persisted mapping
    pub total_records: usize,
    /// Whether the mapping was written back
    pub persisted: bool,
    pub failures: Vec<UnitFailure>,
}

impl ExtractionReport {
    pub fn display_string(&self) -> String {
        format!(
            "{} screenshots found, {} already annotated, {} newly annotated, {} failed",
            self.discovered,
            self.skipped_existing,
            self.annotated,
            self.failures.len()
        )
    }
}

/// Few-shot annotation of every unprocessed screenshot
pub struct Extractor<'a> {
    config: &'a PipelineConfig,
    store: &'a dyn ObjectStore,
    model: &'a dyn AnnotationModel,
    prompt: FewShotPrompt,
}

impl<'a> Extractor<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        store: &'a dyn ObjectStore,
        model: &'a dyn AnnotationModel,
    ) -> Self {
        let prompt = FewShotPrompt::standard(store, &config.model);
        Self {
            config,
            store,
            model,
            prompt,
        }
    }

    /// Replace the production prompt
    pub fn with_prompt(mut self, prompt: FewShotPrompt) -> Self {
        self.prompt = prompt;
        self
    }

    /// Existing results, or an empty mapping when absent or unreadable
    async fn load_existing(&self) -> ResultsMapping {
        match load_results(self.store, &self.config.storage).await {
            Ok(Some(mapping)) => mapping,
            Ok(None) => {
                info!("No existing results file, starting fresh");
                ResultsMapping::new()
            }
            Err(e) => {
                warn!("Could not load or parse existing results file. Starting fresh. Error: {}", e);
                ResultsMapping::new()
            }
        }
    }

    /// List `.png` objects under both input folders (input 1 first)
    pub async fn discover_images(&self, failures: &mut Vec<UnitFailure>) -> Vec<DiscoveredImage> {
        let mut images = Vec::new();

        for prefix in self.config.storage.input_listing_prefixes() {
            match self.store.list(&prefix).await {
                Ok(names) => {
                    let before = images.len();
                    images.extend(
                        names
                            .into_iter()
                            .filter(|name| is_png(name))
                            .map(|path| DiscoveredImage {
                                filename: base_name(&path).to_string(),
                                path,
                            }),
                    );
                    info!(prefix = %prefix, images = images.len() - before, "Listed input folder");
                }
                Err(e) => failures.push(UnitFailure::record(
                    prefix.clone(),
                    FailureKind::Remote,
                    format!("Could not list input folder: {}", e),
                )),
            }
        }

        images
    }

    pub async fn run(&self) -> eews_common::Result<ExtractionReport> {
        let mut report = ExtractionReport::default();
        let mut mapping = self.load_existing().await;
        let delay = Duration::from_millis(self.config.model.request_delay_ms);

        let images = self.discover_images(&mut report.failures).await;
        report.discovered = images.len();

        info!(
            model = %self.model.name(),
            images = images.len(),
            existing = mapping.len(),
            "Starting extraction"
        );

        for image in &images {
            if mapping.contains(&image.filename) {
                info!("Skipping file (already processed): {}", image.filename);
                report.skipped_existing += 1;
                continue;
            }

            info!("Processing file: {}", image.filename);
            match self.annotate(image).await {
                Ok(record) => {
                    mapping.insert(image.filename.clone(), record);
                    report.annotated += 1;
                }
                Err(failure) => report.failures.push(failure),
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        report.total_records = mapping.len();
        if mapping.is_empty() {
            info!("No files were processed.");
        } else {
            save_results(self.store, &self.config.storage, &mapping).await?;
            report.persisted = true;
        }

        info!("{}", report.display_string());
        Ok(report)
    }

    async fn annotate(&self, image: &DiscoveredImage) -> Result<eews_common::AnnotationRecord, UnitFailure> {
        let request = self.prompt.request_for(&self.store.uri(&image.path));

        let text = self.model.generate(&request).await.map_err(|e| {
            UnitFailure::record(&image.filename, FailureKind::Remote, e.to_string())
        })?;

        tracing::debug!(file = %image.filename, "Model output received:\n{}", text);

        parse_annotation(&text)
            .map_err(|e| UnitFailure::record(&image.filename, FailureKind::Parse, e.to_string()))
    }
}

fn is_png(name: &str) -> bool {
    name.to_lowercase().ends_with(".png")
}
