use thiserror::Error;

use ephemera_blob::BlobError;
use ephemera_core::{CoreError, Denial};
use ephemera_ledger::LedgerError;

/// Errors surfaced by the lifecycle coordinator and janitor.
///
/// Denials map one-to-one onto [`Denial`]; the HTTP layer turns each
/// variant into a status code.
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// The token is unknown, or the grant was already consumed or removed.
    #[error("grant not found")]
    NotFound,

    #[error("grant has expired")]
    Expired,

    #[error("grant has no views left")]
    Exhausted,

    #[error("PIN required")]
    PinRequired,

    #[error("invalid PIN")]
    PinMismatch,

    /// Blob store I/O failed. A view consumed before the failure stays
    /// consumed.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// The request itself is malformed (bad PIN format, unsupported type).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Missing or invalid components when building the lifecycle.
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<Denial> for LifecycleError {
    fn from(denial: Denial) -> Self {
        match denial {
            Denial::Expired => Self::Expired,
            Denial::Exhausted => Self::Exhausted,
            Denial::PinRequired => Self::PinRequired,
            Denial::PinMismatch => Self::PinMismatch,
        }
    }
}

impl From<BlobError> for LifecycleError {
    fn from(err: BlobError) -> Self {
        match err {
            BlobError::InvalidContentType(ct) => {
                Self::InvalidRequest(format!("unsupported content type: {ct}"))
            }
            other => Self::StorageFailure(other.to_string()),
        }
    }
}

impl From<CoreError> for LifecycleError {
    fn from(err: CoreError) -> Self {
        Self::InvalidRequest(err.to_string())
    }
}
