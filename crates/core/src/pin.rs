use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::CoreError;

/// Required number of digits in a PIN.
pub const PIN_LENGTH: usize = 4;

/// A validated raw PIN: exactly [`PIN_LENGTH`] ASCII digits.
///
/// Only ever held transiently while a share is being created; grants store
/// the [`PinHash`] instead.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    /// Validate a raw PIN. Surrounding whitespace is ignored.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim();
        if trimmed.len() == PIN_LENGTH && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_owned()))
        } else {
            Err(CoreError::InvalidPin)
        }
    }

    /// Digest this PIN for storage.
    pub fn hash(&self) -> PinHash {
        PinHash::digest(&self.0)
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin([REDACTED])")
    }
}

/// `SHA-256` digest of a PIN.
///
/// Deliberately does not implement `PartialEq`: the only comparison offered
/// is [`PinHash::verify`], which runs in constant time over the digest.
#[derive(Clone, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct PinHash([u8; 32]);

impl PinHash {
    /// Hash a raw PIN string.
    pub fn digest(raw: &str) -> Self {
        let mut out = [0u8; 32];
        out.copy_from_slice(&Sha256::digest(raw.as_bytes()));
        Self(out)
    }

    /// Check a candidate PIN against this digest in constant time.
    pub fn verify(&self, candidate: &str) -> bool {
        let candidate = Self::digest(candidate);
        self.0.ct_eq(&candidate.0).into()
    }

    /// Lowercase hex rendering of the digest.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a hex-encoded digest.
    pub fn from_hex(raw: &str) -> Result<Self, CoreError> {
        let bytes = hex::decode(raw).map_err(|e| CoreError::InvalidPinHash(e.to_string()))?;
        let digest: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            CoreError::InvalidPinHash(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self(digest))
    }
}

impl fmt::Debug for PinHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PinHash([REDACTED])")
    }
}

impl From<PinHash> for String {
    fn from(hash: PinHash) -> Self {
        hash.to_hex()
    }
}

impl TryFrom<String> for PinHash {
    type Error = CoreError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::from_hex(&raw)
    }
}
