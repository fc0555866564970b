pub mod access;
pub mod clock;
pub mod error;
pub mod grant;
pub mod limit;
pub mod pin;
pub mod token;

pub use access::{Denial, Verdict, evaluate};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::CoreError;
pub use grant::{DEFAULT_GRANT_TTL_HOURS, GrantRecord, GrantState, GrantSummary, NewGrant};
pub use limit::{UNLIMITED_SENTINEL, ViewLimit};
pub use pin::{PIN_LENGTH, Pin, PinHash};
pub use token::{RandomTokenGenerator, TOKEN_BYTES, Token, TokenGenerator};
