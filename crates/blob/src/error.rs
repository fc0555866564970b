use thiserror::Error;

/// Errors that can occur during blob storage operations.
///
/// A missing object is not an error: lookups return `None` and deletes
/// return `false`.
#[derive(Debug, Error)]
pub enum BlobError {
    /// The content type is not a supported image type.
    #[error("invalid content type: {0}")]
    InvalidContentType(String),

    /// The backend could not be reached.
    #[error("blob connection error: {0}")]
    Connection(String),

    /// The backend did not answer in time.
    #[error("blob operation timed out")]
    Timeout,

    /// Any other backend failure.
    #[error("blob storage error: {0}")]
    Storage(String),
}

impl BlobError {
    /// Map a backend error message onto the closest variant.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("timeout") || lower.contains("timed out") {
            Self::Timeout
        } else if lower.contains("connection")
            || lower.contains("connect")
            || lower.contains("dns")
            || lower.contains("network")
        {
            Self::Connection(message.to_owned())
        } else {
            Self::Storage(message.to_owned())
        }
    }
}
