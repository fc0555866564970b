mod grants;
mod logging;
mod server;
mod storage;
mod upload;


pub use grants::*;
pub use logging::*;
pub use server::*;
pub use storage::*;
pub use upload::*;

use std::path::Path;

use serde::Deserialize;

use crate::error::ServerError;

/// Top-level configuration for the ephemera server, loaded from a TOML file.
#[derive(Debug, Default, Deserialize)]
pub struct EphemeraConfig {
    /// HTTP server bind configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Upload size and file type limits.
    #[serde(default)]
    pub upload: UploadConfig,
    /// Grant lifetime and blob fetch bounds.
    #[serde(default)]
    pub grants: GrantsConfig,
    /// Background sweep of expired grants.
    #[serde(default)]
    pub janitor: JanitorConfig,
    /// Blob storage backend.
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EphemeraConfig {
    /// Load configuration from `path`, or use defaults if the file does not
    /// exist.
    pub fn load(path: &Path) -> Result<Self, ServerError> {
        let config: Self = if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            toml::from_str(&contents)
                .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?
        } else {
            Self::default()
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the server cannot run with.
    pub fn validate(&self) -> Result<(), ServerError> {
        if self.upload.max_bytes == 0 {
            return Err(ServerError::Config("upload.max_bytes must be > 0".into()));
        }
        if self.upload.allowed_extensions.is_empty() {
            return Err(ServerError::Config(
                "upload.allowed_extensions must not be empty".into(),
            ));
        }
        if self.grants.ttl_hours == 0 {
            return Err(ServerError::Config("grants.ttl_hours must be > 0".into()));
        }
        if self.grants.fetch_timeout_seconds == 0 {
            return Err(ServerError::Config(
                "grants.fetch_timeout_seconds must be > 0".into(),
            ));
        }
        if self.janitor.interval_seconds == 0 {
            return Err(ServerError::Config(
                "janitor.interval_seconds must be > 0".into(),
            ));
        }
        if self.storage.backend == StorageBackend::S3 && self.storage.bucket.is_none() {
            return Err(ServerError::Config(
                "storage.bucket is required for the s3 backend".into(),
            ));
        }
        Ok(())
    }
}
