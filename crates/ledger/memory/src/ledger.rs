use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, warn};

use ephemera_core::{
    Clock, DEFAULT_GRANT_TTL_HOURS, GrantRecord, NewGrant, RandomTokenGenerator, SystemClock,
    Token, TokenGenerator, Verdict, evaluate,
};
use ephemera_ledger::{
    ConsumeOutcome, Consumed, ExpiredGrant, GrantLedger, LedgerError, MAX_TOKEN_ATTEMPTS,
};

/// In-memory [`GrantLedger`] backed by a [`DashMap`].
///
/// Per-token exclusion comes from the map's shard write lock: every
/// mutating operation goes through the `entry` API, so evaluation and the
/// view decrement for one token happen under a single lock acquisition.
/// Operations on tokens in other shards proceed in parallel.
pub struct MemoryGrantLedger {
    grants: DashMap<Token, GrantRecord>,
    clock: Arc<dyn Clock>,
    tokens: Arc<dyn TokenGenerator>,
    ttl: TimeDelta,
}

impl MemoryGrantLedger {
    /// Create an empty ledger using the system clock, random tokens and the
    /// default grant lifetime.
    pub fn new() -> Self {
        Self {
            grants: DashMap::new(),
            clock: Arc::new(SystemClock),
            tokens: Arc::new(RandomTokenGenerator),
            ttl: TimeDelta::hours(DEFAULT_GRANT_TTL_HOURS),
        }
    }

    /// Use `clock` to stamp `created_at` on new grants.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn with_token_generator(mut self, tokens: Arc<dyn TokenGenerator>) -> Self {
        self.tokens = tokens;
        self
    }

    /// Lifetime of newly issued grants.
    #[must_use]
    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    fn consumed(record: &GrantRecord, exhausted: bool) -> Consumed {
        Consumed {
            token: record.token.clone(),
            blob_key: record.blob_key.clone(),
            content_type: record.content_type.clone(),
            view_limit: record.view_limit,
            views_remaining: record.views_remaining,
            prevent_download: record.prevent_download,
            exhausted,
        }
    }
}

impl Default for MemoryGrantLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemoryGrantLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryGrantLedger")
            .field("grants", &self.grants.len())
            .field("clock", &self.clock)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl GrantLedger for MemoryGrantLedger {
    async fn create(&self, grant: NewGrant) -> Result<GrantRecord, LedgerError> {
        for attempt in 1..=MAX_TOKEN_ATTEMPTS {
            let token = self.tokens.generate();
            match self.grants.entry(token) {
                Entry::Occupied(occupied) => {
                    warn!(attempt, token = %occupied.key(), "token collision, regenerating");
                }
                Entry::Vacant(vacant) => {
                    let record = GrantRecord::issue(
                        vacant.key().clone(),
                        grant,
                        self.clock.now(),
                        self.ttl,
                    );
                    vacant.insert(record.clone());
                    debug!(token = %record.token, limit = %record.view_limit, "grant created");
                    return Ok(record);
                }
            }
        }
        Err(LedgerError::TokenSpace {
            attempts: MAX_TOKEN_ATTEMPTS,
        })
    }

    async fn get(&self, token: &Token) -> Result<Option<GrantRecord>, LedgerError> {
        Ok(self.grants.get(token).map(|entry| entry.value().clone()))
    }

    async fn try_consume(
        &self,
        token: &Token,
        pin: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<ConsumeOutcome, LedgerError> {
        // The shard stays write-locked until `occupied` is dropped.
        let Entry::Occupied(mut occupied) = self.grants.entry(token.clone()) else {
            return Ok(ConsumeOutcome::NotFound);
        };

        let outcome = match evaluate(occupied.get(), pin, now) {
            Verdict::Allow => {
                let remaining = occupied.get_mut().record_view();
                if remaining == Some(0) {
                    let record = occupied.remove();
                    ConsumeOutcome::Allowed(Self::consumed(&record, true))
                } else {
                    ConsumeOutcome::Allowed(Self::consumed(occupied.get(), false))
                }
            }
            Verdict::Deny(reason) if reason.requires_removal() => {
                let record = occupied.remove();
                ConsumeOutcome::Denied {
                    reason,
                    reclaimed: Some(record.blob_key),
                }
            }
            Verdict::Deny(reason) => ConsumeOutcome::Denied {
                reason,
                reclaimed: None,
            },
        };
        Ok(outcome)
    }

    async fn remove(&self, token: &Token) -> Result<Option<GrantRecord>, LedgerError> {
        Ok(self.grants.remove(token).map(|(_, record)| record))
    }

    async fn snapshot_expired(&self, now: DateTime<Utc>) -> Result<Vec<ExpiredGrant>, LedgerError> {
        Ok(self
            .grants
            .iter()
            .filter(|entry| entry.is_expired_at(now))
            .map(|entry| ExpiredGrant {
                token: entry.token.clone(),
                blob_key: entry.blob_key.clone(),
                expires_at: entry.expires_at,
            })
            .collect())
    }

    async fn live_count(&self) -> Result<usize, LedgerError> {
        Ok(self.grants.len())
    }
}
