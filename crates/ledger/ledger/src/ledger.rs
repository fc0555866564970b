use async_trait::async_trait;
use chrono::{DateTime, Utc};

use ephemera_core::{Denial, GrantRecord, NewGrant, Token, ViewLimit};

use crate::error::LedgerError;

/// How many fresh tokens `create` tries before giving up on collisions.
pub const MAX_TOKEN_ATTEMPTS: u32 = 8;

/// A view granted by [`GrantLedger::try_consume`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Consumed {
    pub token: Token,
    pub blob_key: String,
    pub content_type: String,
    pub view_limit: ViewLimit,
    /// Views left after this one; `None` for unlimited grants.
    pub views_remaining: Option<u32>,
    pub prevent_download: bool,
    /// `true` when this view spent the last one and the record was removed.
    /// The caller owns deleting the blob.
    pub exhausted: bool,
}

/// Result of a consume attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The view was granted and exactly one view was spent.
    Allowed(Consumed),
    /// The view was refused. No view was spent.
    Denied {
        reason: Denial,
        /// Blob key of a record this call removed because it was expired or
        /// exhausted. The caller owns deleting the blob.
        reclaimed: Option<String>,
    },
    /// No live record for the token.
    NotFound,
}

/// An expired grant found by [`GrantLedger::snapshot_expired`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpiredGrant {
    pub token: Token,
    pub blob_key: String,
    pub expires_at: DateTime<Utc>,
}

/// Authoritative, concurrency-safe mapping from token to grant record.
///
/// Implementations must serialize [`try_consume`](Self::try_consume) calls
/// for the same token so that no two callers both spend the last view, and
/// must not block callers working on different tokens. Whichever call
/// removes a record (consume, [`remove`](Self::remove)) is the only one that
/// ever receives it back, which is what keeps blob deletion exactly-once.
///
/// No method may perform blob-store I/O.
#[async_trait]
pub trait GrantLedger: Send + Sync {
    /// Issue a new grant under a freshly generated token.
    ///
    /// Token collisions are retried up to [`MAX_TOKEN_ATTEMPTS`] times.
    async fn create(&self, grant: NewGrant) -> Result<GrantRecord, LedgerError>;

    /// Read-only snapshot of a record.
    async fn get(&self, token: &Token) -> Result<Option<GrantRecord>, LedgerError>;

    /// Evaluate and, if allowed, spend one view, all under the token's
    /// exclusion.
    ///
    /// Records found expired or exhausted are removed in the same critical
    /// section and their blob key is handed back. PIN denials leave the
    /// record untouched.
    async fn try_consume(
        &self,
        token: &Token,
        pin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, LedgerError>;

    /// Remove a record unconditionally. Returns it the first time, `None`
    /// afterwards.
    async fn remove(&self, token: &Token) -> Result<Option<GrantRecord>, LedgerError>;

    /// Every record whose window closed at or before `now`.
    ///
    /// Read-only; calling it again restarts the enumeration from scratch.
    async fn snapshot_expired(&self, now: DateTime<Utc>) -> Result<Vec<ExpiredGrant>, LedgerError>;

    /// Number of records currently held.
    async fn live_count(&self) -> Result<usize, LedgerError>;
}
