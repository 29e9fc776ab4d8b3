//! eews-viz - Visualization Suite
//!
//! Renders the chart set for the current results mapping and uploads it to
//! the visualization folder.

use anyhow::{Context, Result};
use eews_common::logging::init_tracing;
use eews_common::outcome::log_failure_summary;
use eews_common::storage::GcsClient;
use eews_common::PipelineConfig;
use tracing::info;

use eews_viz::Visualizer;

#[tokio::main]
async fn main() -> Result<()> {
    let config = PipelineConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting eews-viz (Visualization Suite)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let store = GcsClient::from_environment(&config.storage.bucket)
        .context("Could not initialize storage client")?;

    let report = Visualizer::new(&config, &store)
        .run()
        .await
        .context("Visualization run failed")?;

    log_failure_summary("eews-viz", &report.failures);
    Ok(())
}
