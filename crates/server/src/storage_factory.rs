//! Construct the configured [`BlobStore`] backend.

use std::sync::Arc;

use ephemera_blob::{BlobStore, MemoryBlobStore};
use tracing::info;

use crate::config::{StorageBackend, StorageConfig};
use crate::error::ServerError;

/// Build the blob store selected by `config.backend`.
pub async fn create_blob_store(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, ServerError> {
    match config.backend {
        StorageBackend::Memory => {
            info!("using in-memory blob store; images are lost on restart");
            Ok(Arc::new(MemoryBlobStore::new()))
        }
        StorageBackend::S3 => create_s3(config).await,
    }
}

#[cfg(feature = "s3")]
async fn create_s3(config: &StorageConfig) -> Result<Arc<dyn BlobStore>, ServerError> {
    use ephemera_blob::{S3BlobConfig, S3BlobStore};

    let bucket = config
        .bucket
        .clone()
        .ok_or_else(|| ServerError::Config("storage.bucket is required for s3".into()))?;

    let mut s3_config = S3BlobConfig::new(&config.region, bucket);
    if let Some(endpoint) = &config.endpoint_url {
        s3_config = s3_config.with_endpoint_url(endpoint);
    }
    if let Some(prefix) = &config.prefix {
        s3_config = s3_config.with_prefix(prefix);
    }

    info!(
        bucket = %s3_config.bucket,
        region = %s3_config.region,
        "using S3 blob store"
    );
    let store = S3BlobStore::new(s3_config).await;
    Ok(Arc::new(store))
}

#[cfg(not(feature = "s3"))]
#[allow(clippy::unused_async)]
async fn create_s3(_config: &StorageConfig) -> Result<Arc<dyn BlobStore>, ServerError> {
    Err(ServerError::Config(
        "storage backend \"s3\" requires building with the `s3` feature".into(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_backend_by_default() {
        let store = create_blob_store(&StorageConfig::default()).await.unwrap();
        assert!(!store.exists("nothing.png").await.unwrap());
    }

    #[cfg(not(feature = "s3"))]
    #[tokio::test]
    async fn s3_without_feature_is_a_config_error() {
        let config = StorageConfig {
            backend: StorageBackend::S3,
            bucket: Some("b".into()),
            ..StorageConfig::default()
        };
        let err = create_blob_store(&config).await.err().unwrap();
        assert!(matches!(err, ServerError::Config(_)));
    }
}
