use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use crate::error::BlobError;
use crate::store::BlobStore;
use crate::types::{StoredBlob, generate_key};

/// In-memory [`BlobStore`] backed by a [`DashMap`].
///
/// Contents are lost on restart.
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    blobs: DashMap<String, StoredBlob>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of blobs currently stored.
    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, data: Bytes, content_type: &str) -> Result<String, BlobError> {
        let key = generate_key(content_type)?;
        let blob = StoredBlob {
            data,
            content_type: content_type.to_owned(),
            created_at: Some(Utc::now()),
        };
        debug!(key = %key, size = blob.size_bytes(), "storing blob in memory");
        self.blobs.insert(key.clone(), blob);
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, BlobError> {
        Ok(self.blobs.get(key).map(|entry| entry.value().clone()))
    }

    async fn delete(&self, key: &str) -> Result<bool, BlobError> {
        Ok(self.blobs.remove(key).is_some())
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        Ok(self.blobs.contains_key(key))
    }
}
