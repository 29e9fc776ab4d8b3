//! Object storage access
//!
//! Every stage talks to the bucket through [`ObjectStore`]. Paths are
//! bucket-relative object names (`INPUTS_1/shot.png`).
//!
//! Implementations:
//! - [`GcsClient`]: Google Cloud Storage JSON API
//! - [`InMemoryStore`]: process-local store for tests and offline runs

mod gcs;
mod memory;

pub use gcs::GcsClient;
pub use memory::InMemoryStore;

use async_trait::async_trait;
use thiserror::Error;

/// Object storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Object not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    Api(u16, String),

    #[error("Unauthorized (check credentials)")]
    Unauthorized,

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Bucket operations used by the pipeline
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Names of all objects whose name starts with `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError>;

    async fn exists(&self, path: &str) -> Result<bool, StorageError>;

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or overwrite an object
    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    /// Server-side copy within the bucket
    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError>;

    async fn delete(&self, path: &str) -> Result<(), StorageError>;

    /// Rename as copy then delete (not atomic)
    async fn rename(&self, from: &str, to: &str) -> Result<(), StorageError> {
        self.copy(from, to).await?;
        self.delete(from).await
    }

    /// `gs://` URI of an object, as referenced by model requests
    fn uri(&self, path: &str) -> String;
}
