//! eews-clean - Dataset Cleaning
//!
//! Filters the results mapping by alert magnitude and date window, relocating
//! screenshots of removed records.

use anyhow::{Context, Result};
use eews_common::logging::init_tracing;
use eews_common::outcome::log_failure_summary;
use eews_common::storage::GcsClient;
use eews_common::PipelineConfig;
use tracing::info;

use eews_clean::Cleaner;

#[tokio::main]
async fn main() -> Result<()> {
    let config = PipelineConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting eews-clean (Dataset Cleaning)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let store = GcsClient::from_environment(&config.storage.bucket)
        .context("Could not initialize storage client")?;

    let report = Cleaner::new(&config, &store)
        .run()
        .await
        .context("Cleaning run failed")?;

    log_failure_summary("eews-clean", &report.failures);
    Ok(())
}
