use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::error::BlobError;

/// Content type assumed when a backend does not report one.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// A stored image: raw bytes plus the metadata needed to serve them.
#[derive(Debug, Clone)]
pub struct StoredBlob {
    /// The raw image bytes.
    pub data: Bytes,
    /// MIME content type (e.g. `"image/png"`).
    pub content_type: String,
    /// When the blob was stored, if the backend tracks it.
    pub created_at: Option<DateTime<Utc>>,
}

impl StoredBlob {
    pub fn new(data: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            data,
            content_type: content_type.into(),
            created_at: None,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// File extension used for a supported image content type.
pub fn extension_for(content_type: &str) -> Result<&'static str, BlobError> {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    match essence.as_str() {
        "image/jpeg" | "image/jpg" => Ok("jpg"),
        "image/png" => Ok("png"),
        "image/gif" => Ok("gif"),
        "image/webp" => Ok("webp"),
        _ => Err(BlobError::InvalidContentType(content_type.to_owned())),
    }
}

/// Generate a fresh object key (`<uuid-v4>.<ext>`) for `content_type`.
pub fn generate_key(content_type: &str) -> Result<String, BlobError> {
    let ext = extension_for(content_type)?;
    Ok(format!("{}.{ext}", uuid::Uuid::new_v4()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_for_known_types() {
        assert_eq!(extension_for("image/jpeg").unwrap(), "jpg");
        assert_eq!(extension_for("IMAGE/PNG").unwrap(), "png");
        assert_eq!(extension_for("image/webp; charset=binary").unwrap(), "webp");
        assert_eq!(extension_for("image/gif").unwrap(), "gif");
    }

    #[test]
    fn extension_for_rejects_non_images() {
        assert!(matches!(
            extension_for("application/pdf"),
            Err(BlobError::InvalidContentType(_))
        ));
    }

    #[test]
    fn generated_keys_are_unique_and_suffixed() {
        let a = generate_key("image/png").unwrap();
        let b = generate_key("image/png").unwrap();
        assert_ne!(a, b);
        assert!(a.ends_with(".png"));
    }
}
