use thiserror::Error;

/// Errors raised while constructing or validating core grant types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    /// The requested view limit is neither `-1` (unlimited) nor a positive count.
    #[error("invalid view limit {0}: expected -1 (unlimited) or a positive count")]
    InvalidViewLimit(i64),

    /// The supplied PIN is not exactly four ASCII digits.
    #[error("PIN must be exactly 4 digits")]
    InvalidPin,

    /// A stored PIN digest could not be decoded.
    #[error("invalid PIN digest: {0}")]
    InvalidPinHash(String),
}
