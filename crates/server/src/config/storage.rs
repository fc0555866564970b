use serde::Deserialize;

/// Which blob store backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local storage; contents are lost on restart.
    #[default]
    Memory,
    /// S3-compatible object storage. Requires the `s3` feature.
    S3,
}

/// Blob storage backend configuration.
#[derive(Debug, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,
    /// Bucket name (required for `s3`).
    pub bucket: Option<String>,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint, e.g. `http://localhost:4566` for LocalStack.
    pub endpoint_url: Option<String>,
    /// Key prefix for every stored object.
    pub prefix: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            bucket: None,
            region: default_region(),
            endpoint_url: None,
            prefix: None,
        }
    }
}

fn default_region() -> String {
    "us-east-2".to_owned()
}
