//! eews-extract - Screenshot Annotation
//!
//! Annotates every not-yet-processed screenshot in the two input folders and
//! writes the accumulated results mapping back to the bucket.

use anyhow::{Context, Result};
use eews_common::auth::resolve_access_token;
use eews_common::logging::init_tracing;
use eews_common::outcome::log_failure_summary;
use eews_common::storage::GcsClient;
use eews_common::PipelineConfig;
use tracing::info;

use eews_extract::vertex::VertexClient;
use eews_extract::Extractor;

#[tokio::main]
async fn main() -> Result<()> {
    let config = PipelineConfig::load().context("Failed to load configuration")?;
    init_tracing(&config.logging);

    info!("Starting eews-extract (Screenshot Annotation)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let token = resolve_access_token().context("Could not obtain Google Cloud credentials")?;
    let store = GcsClient::new(&config.storage.bucket, token.clone())
        .context("Could not initialize storage client")?;
    info!("Storage client initialized for bucket {}", store.bucket());

    let model = VertexClient::new(&config.gcp, &config.model, token)
        .context("Could not initialize Vertex AI client")?;

    let report = Extractor::new(&config, &store, &model)
        .run()
        .await
        .context("Extraction run failed")?;

    log_failure_summary("eews-extract", &report.failures);
    Ok(())
}
