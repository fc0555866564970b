use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::{Instrument, debug, info, instrument, warn};

use ephemera_blob::BlobStore;
use ephemera_core::{Clock, Denial, GrantRecord, GrantState, GrantSummary, NewGrant, Pin, Token, ViewLimit};
use ephemera_ledger::{ConsumeOutcome, Consumed, GrantLedger};

use crate::error::LifecycleError;
use crate::metrics::LifecycleMetrics;
use crate::reclaim::{ReclaimOutcome, reclaim_blob};

/// Options chosen by the uploader when sharing an image.
#[derive(Debug, Clone, Default)]
pub struct ShareOptions {
    pub view_limit: ViewLimit,
    pub pin: Option<Pin>,
    /// Advisory hint passed through to the viewer.
    pub prevent_download: bool,
}

/// A successfully delivered view.
#[derive(Clone)]
pub struct View {
    pub token: Token,
    pub data: Bytes,
    pub content_type: String,
    pub view_limit: ViewLimit,
    /// Views left after this one; `None` for unlimited grants.
    pub views_remaining: Option<u32>,
    pub prevent_download: bool,
    /// This view spent the last one; the grant and blob are gone.
    pub exhausted: bool,
}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("token", &self.token)
            .field("bytes", &self.data.len())
            .field("content_type", &self.content_type)
            .field("views_remaining", &self.views_remaining)
            .field("exhausted", &self.exhausted)
            .finish_non_exhaustive()
    }
}

/// Orchestrates uploads and views across the ledger and the blob store.
///
/// Ledger mutations and blob I/O are separate steps: the ledger decides
/// (and removes records) under its own per-token exclusion, and whichever
/// call removed a record is the one that deletes the blob. Cheap to clone.
#[derive(Clone)]
pub struct LifecycleCoordinator {
    ledger: Arc<dyn GrantLedger>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LifecycleMetrics>,
    fetch_timeout: Duration,
}

impl LifecycleCoordinator {
    pub(crate) fn new(
        ledger: Arc<dyn GrantLedger>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<LifecycleMetrics>,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            ledger,
            blobs,
            clock,
            metrics,
            fetch_timeout,
        }
    }

    pub fn metrics(&self) -> &Arc<LifecycleMetrics> {
        &self.metrics
    }

    pub fn ledger(&self) -> &Arc<dyn GrantLedger> {
        &self.ledger
    }

    /// Store `data` and issue a grant for it.
    ///
    /// If the grant cannot be issued the blob is deleted again, so a failed
    /// upload never leaves an unreachable object behind.
    #[instrument(skip_all, fields(content_type = %content_type, size = data.len()))]
    pub async fn upload(
        &self,
        data: Bytes,
        content_type: &str,
        options: ShareOptions,
    ) -> Result<GrantRecord, LifecycleError> {
        let blob_key = self.blobs.put(data, content_type).await.map_err(|e| {
            let err = LifecycleError::from(e);
            if matches!(err, LifecycleError::StorageFailure(_)) {
                self.metrics.increment_storage_failures();
            }
            err
        })?;

        let mut grant = NewGrant::new(blob_key.clone(), content_type, options.view_limit)
            .with_prevent_download(options.prevent_download);
        if let Some(pin) = options.pin.as_ref() {
            grant = grant.with_pin(pin.hash());
        }

        match self.ledger.create(grant).await {
            Ok(record) => {
                self.metrics.increment_uploads();
                info!(
                    token = %record.token,
                    blob_key = %record.blob_key,
                    limit = %record.view_limit,
                    pin = record.pin_required(),
                    "grant issued"
                );
                Ok(record)
            }
            Err(e) => {
                warn!(blob_key = %blob_key, error = %e, "grant creation failed, deleting blob");
                reclaim_blob(self.blobs.as_ref(), &self.metrics, &blob_key).await;
                Err(e.into())
            }
        }
    }

    /// Describe a grant for the view page without spending a view.
    ///
    /// A grant found expired (or exhausted) here is reclaimed on the spot.
    #[instrument(skip_all, fields(token = %token))]
    pub async fn describe(&self, token: &Token) -> Result<GrantSummary, LifecycleError> {
        let Some(record) = self.ledger.get(token).await? else {
            return Err(LifecycleError::NotFound);
        };

        let denial = match record.state_at(self.clock.now()) {
            GrantState::Live => return Ok(record.summary()),
            GrantState::Expired => Denial::Expired,
            GrantState::Exhausted => Denial::Exhausted,
        };

        // Tokens are never reused, so the record we saw is the one removed.
        if let Some(removed) = self.ledger.remove(token).await? {
            self.note_removal(denial);
            let blob_key = removed.blob_key;
            self.detached(move |this: Self| async move {
                reclaim_blob(this.blobs.as_ref(), &this.metrics, &blob_key).await
            })
            .await?;
        }
        Err(denial.into())
    }

    /// Spend one view of `token` and return the image.
    ///
    /// The fetch, and the blob deletion when this view exhausted the grant,
    /// run in a spawned task: dropping the returned future cannot skip the
    /// deletion. A failed or timed-out fetch does not refund the view.
    #[instrument(skip_all, fields(token = %token))]
    pub async fn view(&self, token: &Token, pin: Option<&str>) -> Result<View, LifecycleError> {
        let now = self.clock.now();
        match self.ledger.try_consume(token, pin, now).await? {
            ConsumeOutcome::NotFound => {
                self.metrics.increment_views_denied();
                debug!("view denied: unknown token");
                Err(LifecycleError::NotFound)
            }
            ConsumeOutcome::Denied { reason, reclaimed } => {
                self.metrics.increment_views_denied();
                if reason == Denial::PinMismatch {
                    self.metrics.increment_pin_mismatches();
                }
                debug!(reason = %reason, "view denied");
                if let Some(blob_key) = reclaimed {
                    self.note_removal(reason);
                    self.detached(move |this: Self| async move {
                        reclaim_blob(this.blobs.as_ref(), &this.metrics, &blob_key).await
                    })
                    .await?;
                }
                Err(reason.into())
            }
            ConsumeOutcome::Allowed(consumed) => {
                self.metrics.increment_views_allowed();
                if consumed.exhausted {
                    self.metrics.increment_grants_exhausted();
                }
                debug!(
                    views_remaining = ?consumed.views_remaining,
                    exhausted = consumed.exhausted,
                    "view allowed"
                );
                self.detached(move |this: Self| async move { this.deliver(consumed).await })
                    .await?
            }
        }
    }

    /// Fetch the blob for a consumed view, then delete it if the view
    /// exhausted the grant. The deletion runs whether or not the fetch
    /// succeeded.
    async fn deliver(&self, consumed: Consumed) -> Result<View, LifecycleError> {
        let fetched = tokio::time::timeout(self.fetch_timeout, self.blobs.get(&consumed.blob_key)).await;

        if consumed.exhausted {
            let outcome = reclaim_blob(self.blobs.as_ref(), &self.metrics, &consumed.blob_key).await;
            if outcome == ReclaimOutcome::Deleted {
                info!(token = %consumed.token, blob_key = %consumed.blob_key, "grant exhausted, blob deleted");
            }
        }

        let failure = match fetched {
            Ok(Ok(Some(blob))) => {
                return Ok(View {
                    token: consumed.token,
                    data: blob.data,
                    content_type: blob.content_type,
                    view_limit: consumed.view_limit,
                    views_remaining: consumed.views_remaining,
                    prevent_download: consumed.prevent_download,
                    exhausted: consumed.exhausted,
                });
            }
            Ok(Ok(None)) => "blob missing from store".to_owned(),
            Ok(Err(e)) => e.to_string(),
            Err(_) => format!("blob fetch timed out after {:?}", self.fetch_timeout),
        };

        self.metrics.increment_storage_failures();
        warn!(
            token = %consumed.token,
            blob_key = %consumed.blob_key,
            error = %failure,
            "view consumed but blob retrieval failed"
        );
        Err(LifecycleError::StorageFailure(failure))
    }

    fn note_removal(&self, reason: Denial) {
        match reason {
            Denial::Expired => self.metrics.increment_grants_expired(),
            Denial::Exhausted => self.metrics.increment_grants_exhausted(),
            Denial::PinRequired | Denial::PinMismatch => {}
        }
    }

    /// Run `work` on its own task and wait for it. The task keeps running
    /// if the caller is dropped.
    async fn detached<F, Fut, T>(&self, work: F) -> Result<T, LifecycleError>
    where
        F: FnOnce(Self) -> Fut,
        Fut: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        tokio::spawn(work(self.clone()).in_current_span())
            .await
            .map_err(|e| LifecycleError::StorageFailure(format!("background task failed: {e}")))
    }
}

impl fmt::Debug for LifecycleCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleCoordinator")
            .field("clock", &self.clock)
            .field("fetch_timeout", &self.fetch_timeout)
            .finish_non_exhaustive()
    }
}
