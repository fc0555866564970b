use std::fmt;

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};

/// Number of random bytes behind every generated token (128 bits).
pub const TOKEN_BYTES: usize = 16;

/// Opaque public handle for a grant, embedded in the share URL.
///
/// Generated tokens are lowercase hex, so they are always safe as a URL
/// path segment. Tokens received from clients are accepted verbatim; an
/// unknown token simply fails to resolve.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Token(String);

impl Token {
    /// Wrap a raw token string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Render random bytes as a token.
    pub fn from_bytes(bytes: &[u8; TOKEN_BYTES]) -> Self {
        Self(hex::encode(bytes))
    }

    /// Borrow the token as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Source of fresh grant tokens.
///
/// Implementations must produce values with at least 128 bits of entropy so
/// that collisions with a live token are cryptographically negligible.
pub trait TokenGenerator: Send + Sync {
    /// Produce a new token.
    fn generate(&self) -> Token;
}

/// [`TokenGenerator`] drawing 128 bits from the operating system RNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomTokenGenerator;

impl TokenGenerator for RandomTokenGenerator {
    fn generate(&self) -> Token {
        let mut bytes = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut bytes);
        Token::from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn random_tokens_are_hex_and_full_width() {
        let token = RandomTokenGenerator.generate();
        assert_eq!(token.as_str().len(), TOKEN_BYTES * 2);
        assert!(token.as_str().bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(token.as_str(), token.as_str().to_lowercase());
    }

    #[test]
    fn random_tokens_do_not_repeat() {
        let tokens: HashSet<Token> = (0..1_000).map(|_| RandomTokenGenerator.generate()).collect();
        assert_eq!(tokens.len(), 1_000);
    }

    #[test]
    fn token_serializes_as_plain_string() {
        let token = Token::new("abc123");
        let json = serde_json::to_string(&token).unwrap();
        assert_eq!(json, "\"abc123\"");
        let back: Token = serde_json::from_str(&json).unwrap();
        assert_eq!(back, token);
    }
}
