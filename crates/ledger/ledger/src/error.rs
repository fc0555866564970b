use thiserror::Error;

/// Errors from grant ledger operations.
///
/// An unknown token is not an error; lookups report it as `None` or
/// [`ConsumeOutcome::NotFound`](crate::ConsumeOutcome::NotFound).
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Every generated token collided with a live one.
    #[error("token generation collided {attempts} times in a row")]
    TokenSpace { attempts: u32 },

    // The variants below are raised by durable backends; the in-memory
    // ledger never fails this way.
    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("backend error: {0}")]
    Backend(String),
}
