//! In-memory object store

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;

use super::{ObjectStore, StorageError};

#[derive(Debug, Clone)]
struct StoredObject {
    bytes: Vec<u8>,
    content_type: String,
}

/// Bucket held in process memory
///
/// Mirrors the semantics of the remote store closely enough to drive whole
/// pipeline runs: missing objects yield [`StorageError::NotFound`], uploads
/// overwrite, copies keep the content type.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    bucket: String,
    objects: Mutex<BTreeMap<String, StoredObject>>,
}

impl InMemoryStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: Mutex::new(BTreeMap::new()),
        }
    }

    /// Seed an object
    pub fn put(&self, path: &str, bytes: impl Into<Vec<u8>>, content_type: &str) {
        self.lock().insert(
            path.to_string(),
            StoredObject {
                bytes: bytes.into(),
                content_type: content_type.to_string(),
            },
        );
    }

    /// Current content of an object
    pub fn get(&self, path: &str) -> Option<Vec<u8>> {
        self.lock().get(path).map(|o| o.bytes.clone())
    }

    pub fn content_type(&self, path: &str) -> Option<String> {
        self.lock().get(path).map(|o| o.content_type.clone())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.lock().contains_key(path)
    }

    /// All object names, sorted
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StoredObject>> {
        // A poisoned lock only means another test thread panicked mid-update
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for InMemoryStore {
    async fn list(&self, prefix: &str) -> Result<Vec<String>, StorageError> {
        Ok(self
            .lock()
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn exists(&self, path: &str) -> Result<bool, StorageError> {
        Ok(self.contains(path))
    }

    async fn download(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.get(path)
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    async fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), StorageError> {
        self.put(path, bytes, content_type);
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> Result<(), StorageError> {
        let mut objects = self.lock();
        let object = objects
            .get(from)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        objects.insert(to.to_string(), object);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StorageError> {
        self.lock()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn uri(&self, path: &str) -> String {
        format!("gs://{}/{}", self.bucket, path)
    }
}
