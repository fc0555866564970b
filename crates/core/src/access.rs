//! Access evaluation: the pure decision of whether a view may proceed.
//!
//! Nothing here mutates a record or performs I/O; callers apply the
//! resulting [`Verdict`] under whatever exclusion their store provides.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::grant::{GrantRecord, GrantState};

/// Why a view was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Denial {
    /// The grant window has closed.
    Expired,
    /// A limited grant has no views left.
    Exhausted,
    /// The grant is PIN-protected and no PIN was supplied.
    PinRequired,
    /// The supplied PIN does not match.
    PinMismatch,
}

impl Denial {
    /// Whether the grant must be reclaimed after this denial.
    ///
    /// PIN denials leave the grant untouched: a wrong PIN never costs a view.
    pub fn requires_removal(self) -> bool {
        matches!(self, Self::Expired | Self::Exhausted)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Exhausted => "exhausted",
            Self::PinRequired => "pin_required",
            Self::PinMismatch => "pin_mismatch",
        }
    }
}

impl fmt::Display for Denial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of evaluating one access request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// The view may proceed; the caller spends exactly one view.
    Allow,
    /// The view is refused.
    Deny(Denial),
}

/// Judge an access request against `record` at `now`.
///
/// Checks run in order: expiry, exhaustion, then PIN. A blank PIN counts
/// as no PIN at all.
pub fn evaluate(record: &GrantRecord, pin: Option<&str>, now: DateTime<Utc>) -> Verdict {
    match record.state_at(now) {
        GrantState::Expired => return Verdict::Deny(Denial::Expired),
        GrantState::Exhausted => return Verdict::Deny(Denial::Exhausted),
        GrantState::Live => {}
    }

    let Some(pin_hash) = record.pin_hash.as_ref() else {
        return Verdict::Allow;
    };

    match pin.map(str::trim).filter(|p| !p.is_empty()) {
        None => Verdict::Deny(Denial::PinRequired),
        Some(candidate) if pin_hash.verify(candidate) => Verdict::Allow,
        Some(_) => Verdict::Deny(Denial::PinMismatch),
    }
}
