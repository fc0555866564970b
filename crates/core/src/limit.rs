use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Wire value standing for "unlimited views".
pub const UNLIMITED_SENTINEL: i64 = -1;

/// How many views a grant was issued with.
///
/// Serialized as a signed integer: a positive count, or `-1` for unlimited
/// views until the grant window closes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum ViewLimit {
    /// A fixed number of views, always at least one.
    Limited(u32),
    /// Any number of views until expiry.
    Unlimited,
}

impl ViewLimit {
    /// Interpret a raw signed limit.
    pub fn from_raw(raw: i64) -> Result<Self, CoreError> {
        match raw {
            UNLIMITED_SENTINEL => Ok(Self::Unlimited),
            n if n >= 1 => u32::try_from(n)
                .map(Self::Limited)
                .map_err(|_| CoreError::InvalidViewLimit(raw)),
            _ => Err(CoreError::InvalidViewLimit(raw)),
        }
    }

    /// The signed wire representation.
    pub fn as_raw(self) -> i64 {
        match self {
            Self::Limited(n) => i64::from(n),
            Self::Unlimited => UNLIMITED_SENTINEL,
        }
    }

    pub fn is_unlimited(self) -> bool {
        matches!(self, Self::Unlimited)
    }

    /// Initial remaining-view budget: `None` means unlimited.
    pub fn initial_remaining(self) -> Option<u32> {
        match self {
            Self::Limited(n) => Some(n),
            Self::Unlimited => None,
        }
    }
}

impl Default for ViewLimit {
    fn default() -> Self {
        Self::Limited(1)
    }
}

impl TryFrom<i64> for ViewLimit {
    type Error = CoreError;

    fn try_from(raw: i64) -> Result<Self, Self::Error> {
        Self::from_raw(raw)
    }
}

impl From<ViewLimit> for i64 {
    fn from(limit: ViewLimit) -> Self {
        limit.as_raw()
    }
}

impl fmt::Display for ViewLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limited(n) => write!(f, "{n}"),
            Self::Unlimited => f.write_str("unlimited"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_raw_accepts_positive_and_sentinel() {
        assert_eq!(ViewLimit::from_raw(1), Ok(ViewLimit::Limited(1)));
        assert_eq!(ViewLimit::from_raw(25), Ok(ViewLimit::Limited(25)));
        assert_eq!(ViewLimit::from_raw(-1), Ok(ViewLimit::Unlimited));
    }

    #[test]
    fn from_raw_rejects_zero_and_other_negatives() {
        assert_eq!(ViewLimit::from_raw(0), Err(CoreError::InvalidViewLimit(0)));
        assert_eq!(ViewLimit::from_raw(-2), Err(CoreError::InvalidViewLimit(-2)));
        assert!(ViewLimit::from_raw(i64::from(u32::MAX) + 1).is_err());
    }

    #[test]
    fn serde_uses_signed_integer() {
        assert_eq!(serde_json::to_string(&ViewLimit::Unlimited).unwrap(), "-1");
        assert_eq!(serde_json::to_string(&ViewLimit::Limited(3)).unwrap(), "3");
        let back: ViewLimit = serde_json::from_str("-1").unwrap();
        assert!(back.is_unlimited());
        assert!(serde_json::from_str::<ViewLimit>("0").is_err());
    }

    #[test]
    fn initial_remaining_tracks_limit() {
        assert_eq!(ViewLimit::Limited(5).initial_remaining(), Some(5));
        assert_eq!(ViewLimit::Unlimited.initial_remaining(), None);
        assert_eq!(ViewLimit::default(), ViewLimit::Limited(1));
    }
}
