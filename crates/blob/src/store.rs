use async_trait::async_trait;
use bytes::Bytes;

use crate::error::BlobError;
use crate::types::StoredBlob;

/// Content storage for image bytes, addressed by opaque key.
///
/// Deletion is idempotent: removing a key that is already gone succeeds and
/// reports `false`, so concurrent reclaimers never observe an error for a
/// blob someone else deleted first.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `data` and return the key assigned to it.
    ///
    /// `content_type` is a hint (e.g. `"image/png"`) used for the key
    /// extension and returned again by [`BlobStore::get`].
    async fn put(&self, data: Bytes, content_type: &str) -> Result<String, BlobError>;

    /// Fetch a blob. Returns `None` if the key does not exist.
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, BlobError>;

    /// Delete a blob. Returns `true` if the blob existed.
    async fn delete(&self, key: &str) -> Result<bool, BlobError>;

    /// Check whether a key exists.
    async fn exists(&self, key: &str) -> Result<bool, BlobError>;
}
