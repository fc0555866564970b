pub mod error;
pub mod ledger;
pub mod testing;

pub use error::LedgerError;
pub use ledger::{ConsumeOutcome, Consumed, ExpiredGrant, GrantLedger, MAX_TOKEN_ATTEMPTS};
