//! Move screenshots of removed records to the deleted folder

use eews_common::config::StorageLayout;
use eews_common::outcome::{FailureKind, UnitFailure};
use eews_common::{ObjectStore, StorageError};
use tracing::info;

/// Where a removed record's screenshot ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Relocation {
    /// Copied from `from` to `to`, original deleted
    Moved { from: String, to: String },
    /// Found in neither input folder
    NotFound,
}

/// Relocate one screenshot
///
/// The first input folder holding `filename` wins; a same-named image in a
/// later input folder stays where it is. Copy and delete are two
/// separate calls; a failure between them leaves the image in both places.
pub async fn relocate_image(
    store: &dyn ObjectStore,
    layout: &StorageLayout,
    filename: &str,
) -> Result<Relocation, StorageError> {
    for source in layout.input_paths(filename) {
        if !store.exists(&source).await? {
            continue;
        }
        let target = layout.deleted_path(filename);
        store.copy(&source, &target).await?;
        store.delete(&source).await?;
        info!("Moved {} to {}", store.uri(&source), store.uri(&target));
        return Ok(Relocation::Moved {
            from: source,
            to: target,
        });
    }
    Ok(Relocation::NotFound)
}

/// Relocate every removed filename, collecting per-file failures
///
/// Returns the number of images moved.
pub async fn relocate_all<'a, I>(
    store: &dyn ObjectStore,
    layout: &StorageLayout,
    filenames: I,
    failures: &mut Vec<UnitFailure>,
) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    let mut moved = 0;
    for filename in filenames {
        match relocate_image(store, layout, filename).await {
            Ok(Relocation::Moved { .. }) => moved += 1,
            Ok(Relocation::NotFound) => failures.push(UnitFailure::record(
                filename,
                FailureKind::MissingArtifact,
                "Image not found in either input folder",
            )),
            Err(e) => failures.push(UnitFailure::record(
                filename,
                FailureKind::Remote,
                format!("Failed to relocate image: {}", e),
            )),
        }
    }
    moved
}
