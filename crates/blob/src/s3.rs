//! Amazon S3 (or S3-compatible) blob backend.

use async_trait::async_trait;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument};

use crate::error::BlobError;
use crate::store::BlobStore;
use crate::types::{DEFAULT_CONTENT_TYPE, StoredBlob, generate_key};

/// Tag set applied to every uploaded object so bucket lifecycle rules can
/// catch anything the service fails to reclaim.
const OBJECT_TAGGING: &str = "purpose=temporary&status=active";

/// Configuration for [`S3BlobStore`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S3BlobConfig {
    /// AWS region (e.g. `"us-east-2"`).
    pub region: String,
    /// Bucket holding the images.
    pub bucket: String,
    /// Endpoint override for S3-compatible services or `LocalStack`.
    pub endpoint_url: Option<String>,
    /// Prefix prepended to every object key (e.g. `"ephemera/"`).
    pub prefix: Option<String>,
}

impl S3BlobConfig {
    pub fn new(region: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            bucket: bucket.into(),
            endpoint_url: None,
            prefix: None,
        }
    }

    /// Set the endpoint URL override.
    #[must_use]
    pub fn with_endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    /// Set the key prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }
}

/// [`BlobStore`] backed by an S3 bucket.
pub struct S3BlobStore {
    config: S3BlobConfig,
    client: aws_sdk_s3::Client,
}

impl std::fmt::Debug for S3BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3BlobStore")
            .field("config", &self.config)
            .field("client", &"<S3Client>")
            .finish()
    }
}

impl S3BlobStore {
    /// Build a store using the standard AWS credential chain.
    pub async fn new(config: S3BlobConfig) -> Self {
        let mut loader =
            aws_config::from_env().region(aws_config::Region::new(config.region.clone()));
        if let Some(endpoint) = &config.endpoint_url {
            debug!(endpoint = %endpoint, "using custom S3 endpoint");
            loader = loader.endpoint_url(endpoint);
        }
        let sdk_config = loader.load().await;

        // Custom endpoints (LocalStack, MinIO) generally need path-style URLs.
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.endpoint_url.is_some())
            .build();
        let client = aws_sdk_s3::Client::from_conf(s3_config);

        info!(bucket = %config.bucket, region = %config.region, "S3 blob store ready");
        Self { config, client }
    }

    /// Create a store with a pre-built client.
    pub fn with_client(config: S3BlobConfig, client: aws_sdk_s3::Client) -> Self {
        Self { config, client }
    }

    fn object_key(&self, key: &str) -> String {
        match &self.config.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_owned(),
        }
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    #[instrument(skip(self, data), fields(bucket = %self.config.bucket, size = data.len()))]
    async fn put(&self, data: Bytes, content_type: &str) -> Result<String, BlobError> {
        let key = generate_key(content_type)?;
        let object_key = self.object_key(&key);

        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .body(ByteStream::from(data))
            .content_type(content_type)
            .metadata("one-time", "true")
            .metadata("created", Utc::now().to_rfc3339())
            .tagging(OBJECT_TAGGING)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(error = %message, "S3 put_object failed");
                BlobError::classify(&message)
            })?;

        debug!(key = %object_key, "S3 object uploaded");
        Ok(key)
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, BlobError> {
        let object_key = self.object_key(key);

        let output = match self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(e) if e.as_service_error().is_some_and(|se| se.is_no_such_key()) => {
                return Ok(None);
            }
            Err(e) => {
                let message = DisplayErrorContext(&e).to_string();
                error!(error = %message, "S3 get_object failed");
                return Err(BlobError::classify(&message));
            }
        };

        let content_type = output
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_owned();
        let data = output
            .body
            .collect()
            .await
            .map_err(|e| BlobError::Storage(format!("failed to read S3 body: {e}")))?
            .into_bytes();

        Ok(Some(StoredBlob::new(data, content_type)))
    }

    #[instrument(skip(self), fields(bucket = %self.config.bucket))]
    async fn delete(&self, key: &str) -> Result<bool, BlobError> {
        // S3 deletes succeed for missing keys, so probe first to report existence.
        let existed = self.exists(key).await?;
        let object_key = self.object_key(key);

        self.client
            .delete_object()
            .bucket(&self.config.bucket)
            .key(&object_key)
            .send()
            .await
            .map_err(|e| {
                let message = DisplayErrorContext(&e).to_string();
                error!(error = %message, "S3 delete_object failed");
                BlobError::classify(&message)
            })?;

        debug!(key = %object_key, existed, "S3 object deleted");
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(self.object_key(key))
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(e) if e.as_service_error().is_some_and(|se| se.is_not_found()) => Ok(false),
            Err(e) => Err(BlobError::classify(&DisplayErrorContext(&e).to_string())),
        }
    }
}
