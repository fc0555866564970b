use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::limit::ViewLimit;
use crate::pin::PinHash;
use crate::token::Token;

/// Default lifetime of a grant, in hours.
pub const DEFAULT_GRANT_TTL_HOURS: i64 = 24;

/// Everything needed to issue a grant, before a token is assigned.
#[derive(Debug, Clone)]
pub struct NewGrant {
    /// Key of the stored image in the blob store.
    pub blob_key: String,
    /// MIME type of the stored image.
    pub content_type: String,
    /// Number of views granted.
    pub view_limit: ViewLimit,
    /// Optional PIN digest gating every view.
    pub pin_hash: Option<PinHash>,
    /// Advisory hint for the viewer to discourage saving the image.
    pub prevent_download: bool,
}

impl NewGrant {
    pub fn new(
        blob_key: impl Into<String>,
        content_type: impl Into<String>,
        view_limit: ViewLimit,
    ) -> Self {
        Self {
            blob_key: blob_key.into(),
            content_type: content_type.into(),
            view_limit,
            pin_hash: None,
            prevent_download: false,
        }
    }

    /// Require a PIN for every view.
    #[must_use]
    pub fn with_pin(mut self, pin_hash: PinHash) -> Self {
        self.pin_hash = Some(pin_hash);
        self
    }

    /// Set the advisory prevent-download hint.
    #[must_use]
    pub fn with_prevent_download(mut self, prevent_download: bool) -> Self {
        self.prevent_download = prevent_download;
        self
    }
}

/// Lifecycle state of a grant, derived from its fields and the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantState {
    /// The grant can still be viewed.
    Live,
    /// The grant window has closed.
    Expired,
    /// A limited grant has no views left.
    Exhausted,
}

/// One issued share link and its remaining-view and expiry bookkeeping.
///
/// The record references the image by key only; the bytes live in the
/// blob store. Serializable so durable ledgers can persist it as is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrantRecord {
    /// Public handle embedded in the share URL.
    pub token: Token,
    /// Key of the stored image in the blob store.
    pub blob_key: String,
    /// MIME type of the stored image.
    pub content_type: String,
    /// Views the grant was issued with.
    pub view_limit: ViewLimit,
    /// Views left; `None` for unlimited grants.
    pub views_remaining: Option<u32>,
    /// Optional PIN digest. The raw PIN is never stored.
    pub pin_hash: Option<PinHash>,
    /// Advisory prevent-download hint, passed through to the viewer.
    pub prevent_download: bool,
    /// When the grant was issued.
    pub created_at: DateTime<Utc>,
    /// When the grant window closes.
    pub expires_at: DateTime<Utc>,
}

impl GrantRecord {
    /// Issue a record for `grant` under `token`, valid for `ttl` from `now`.
    pub fn issue(token: Token, grant: NewGrant, now: DateTime<Utc>, ttl: TimeDelta) -> Self {
        Self {
            token,
            blob_key: grant.blob_key,
            content_type: grant.content_type,
            views_remaining: grant.view_limit.initial_remaining(),
            view_limit: grant.view_limit,
            pin_hash: grant.pin_hash,
            prevent_download: grant.prevent_download,
            created_at: now,
            expires_at: now + ttl,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// `true` once a limited grant has used up its views.
    pub fn is_exhausted(&self) -> bool {
        self.views_remaining == Some(0)
    }

    pub fn pin_required(&self) -> bool {
        self.pin_hash.is_some()
    }

    /// Derive the lifecycle state at `now`. Expiry takes precedence.
    pub fn state_at(&self, now: DateTime<Utc>) -> GrantState {
        if self.is_expired_at(now) {
            GrantState::Expired
        } else if self.is_exhausted() {
            GrantState::Exhausted
        } else {
            GrantState::Live
        }
    }

    /// Spend one view. Unlimited grants are left untouched.
    ///
    /// Returns the views left afterwards (`None` for unlimited grants).
    pub fn record_view(&mut self) -> Option<u32> {
        if let Some(remaining) = self.views_remaining.as_mut() {
            *remaining = remaining.saturating_sub(1);
        }
        self.views_remaining
    }

    /// PIN-free view of the record for display.
    pub fn summary(&self) -> GrantSummary {
        GrantSummary {
            token: self.token.clone(),
            pin_required: self.pin_required(),
            prevent_download: self.prevent_download,
            view_limit: self.view_limit,
            views_remaining: self.views_remaining,
            created_at: self.created_at,
            expires_at: self.expires_at,
        }
    }
}

/// Public description of a grant, safe to hand to viewers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSummary {
    pub token: Token,
    pub pin_required: bool,
    pub prevent_download: bool,
    pub view_limit: ViewLimit,
    pub views_remaining: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
