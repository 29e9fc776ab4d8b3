//! Chart upload
//!
//! A rendered chart is written to a local temporary file, uploaded to the
//! visualization folder and the local file removed again.

use eews_common::config::StorageLayout;
use eews_common::ObjectStore;
use std::io::Write;
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::info;

pub const HTML_CONTENT_TYPE: &str = "text/html";
pub const SVG_CONTENT_TYPE: &str = "image/svg+xml";

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Local file error: {0}")]
    Local(#[from] std::io::Error),

    #[error("Upload failed: {0}")]
    Upload(#[from] eews_common::StorageError),
}

/// Artifact format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// Interactive page (sunbursts)
    Html,
    /// Static image
    Svg,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::Html => "html",
            ArtifactKind::Svg => "svg",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ArtifactKind::Html => HTML_CONTENT_TYPE,
            ArtifactKind::Svg => SVG_CONTENT_TYPE,
        }
    }
}

/// A rendered chart ready for upload
#[derive(Debug, Clone)]
pub struct Artifact {
    pub file_name: String,
    pub kind: ArtifactKind,
    pub body: String,
}

impl Artifact {
    /// Name the artifact after `stem` (see [`artifact_file_name`])
    pub fn new(stem: &str, kind: ArtifactKind, body: String) -> Self {
        Self {
            file_name: artifact_file_name(stem, kind),
            kind,
            body,
        }
    }
}

/// Spaces become `_`, colons are dropped, everything lower-cased
pub fn artifact_file_name(stem: &str, kind: ArtifactKind) -> String {
    let stem: String = stem
        .replace(' ', "_")
        .replace(':', "")
        .to_lowercase();
    format!("{}.{}", stem, kind.extension())
}

pub struct Publisher<'a> {
    store: &'a dyn ObjectStore,
    layout: &'a StorageLayout,
}

impl<'a> Publisher<'a> {
    pub fn new(store: &'a dyn ObjectStore, layout: &'a StorageLayout) -> Self {
        Self { store, layout }
    }

    /// Stage locally, upload, remove the local copy; returns the object path
    pub async fn publish(&self, artifact: &Artifact) -> Result<String, PublishError> {
        let mut local = NamedTempFile::new()?;
        local.write_all(artifact.body.as_bytes())?;
        local.flush()?;

        let bytes = tokio::fs::read(local.path()).await?;
        let path = self.layout.visualization_path(&artifact.file_name);
        self.store
            .upload(&path, bytes, artifact.kind.content_type())
            .await?;
        local.close()?;

        info!("Chart '{}' uploaded to {}", artifact.file_name, self.store.uri(&path));
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eews_common::storage::InMemoryStore;

    #[test]
    fn test_file_names() {
        assert_eq!(
            artifact_file_name("April 23 To 24: Location and Alert Type", ArtifactKind::Html),
            "april_23_to_24_location_and_alert_type.html"
        );
        assert_eq!(
            artifact_file_name("sample_size_overview", ArtifactKind::Svg),
            "sample_size_overview.svg"
        );
        assert_eq!(
            artifact_file_name("user's_gender", ArtifactKind::Svg),
            "user's_gender.svg"
        );
    }

    #[tokio::test]
    async fn test_publish_uploads_with_content_type() {
        let store = InMemoryStore::new("bucket");
        let layout = StorageLayout::default();
        let publisher = Publisher::new(&store, &layout);
        let artifact = Artifact::new("Alert Type and Mode", ArtifactKind::Html, "<html></html>".to_string());

        let path = publisher.publish(&artifact).await.unwrap();

        assert_eq!(path, "VISUALIZATIONS_3/alert_type_and_mode.html");
        assert_eq!(store.get(&path).unwrap(), b"<html></html>".to_vec());
        assert_eq!(store.content_type(&path).as_deref(), Some("text/html"));
    }
}
