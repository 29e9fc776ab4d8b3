//! Results file persistence

use crate::config::StorageLayout;
use crate::record::ResultsMapping;
use crate::storage::ObjectStore;
use crate::Result;

pub const JSON_CONTENT_TYPE: &str = "application/json";

/// Load the results mapping; `None` when the results object does not exist
pub async fn load_results(
    store: &dyn ObjectStore,
    layout: &StorageLayout,
) -> Result<Option<ResultsMapping>> {
    let path = layout.results_path();
    if !store.exists(&path).await? {
        return Ok(None);
    }
    let bytes = store.download(&path).await?;
    let mapping = ResultsMapping::from_json_bytes(&bytes)?;
    tracing::info!(entries = mapping.len(), "Loaded results from {}", store.uri(&path));
    Ok(Some(mapping))
}

/// Write the full mapping to the results path, overwriting it
pub async fn save_results(
    store: &dyn ObjectStore,
    layout: &StorageLayout,
    mapping: &ResultsMapping,
) -> Result<()> {
    let path = layout.results_path();
    let bytes = mapping.to_json_bytes()?;
    store.upload(&path, bytes, JSON_CONTENT_TYPE).await?;
    tracing::info!(entries = mapping.len(), "Results saved to {}", store.uri(&path));
    Ok(())
}
