use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, error, info, instrument};

use ephemera_blob::BlobStore;
use ephemera_core::Clock;
use ephemera_ledger::GrantLedger;

use crate::error::LifecycleError;
use crate::metrics::LifecycleMetrics;
use crate::reclaim::reclaim_blob;

/// Totals from one janitor sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Expired grants this sweep removed from the ledger.
    pub reclaimed: u64,
    /// Grants that were gone by the time the sweep reached them.
    pub already_gone: u64,
    /// Grants whose removal or blob deletion failed.
    pub failed: u64,
}

impl SweepReport {
    pub fn is_empty(&self) -> bool {
        self.reclaimed == 0 && self.already_gone == 0 && self.failed == 0
    }
}

/// Periodic reclamation of expired grants that nobody viewed.
///
/// Each expired grant is handled on its own: a failure to remove one
/// record or delete one blob is logged and the sweep moves on.
#[derive(Clone)]
pub struct Janitor {
    ledger: Arc<dyn GrantLedger>,
    blobs: Arc<dyn BlobStore>,
    clock: Arc<dyn Clock>,
    metrics: Arc<LifecycleMetrics>,
    interval: Duration,
}

impl Janitor {
    pub(crate) fn new(
        ledger: Arc<dyn GrantLedger>,
        blobs: Arc<dyn BlobStore>,
        clock: Arc<dyn Clock>,
        metrics: Arc<LifecycleMetrics>,
        interval: Duration,
    ) -> Self {
        Self {
            ledger,
            blobs,
            clock,
            metrics,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Remove every grant expired as of now and delete its blob.
    ///
    /// Running it again immediately is a no-op.
    #[instrument(skip_all)]
    pub async fn sweep(&self) -> Result<SweepReport, LifecycleError> {
        let now = self.clock.now();
        let expired = self.ledger.snapshot_expired(now).await?;
        let mut report = SweepReport::default();

        for grant in expired {
            match self.ledger.remove(&grant.token).await {
                Ok(Some(record)) => {
                    self.metrics.increment_grants_expired();
                    let outcome =
                        reclaim_blob(self.blobs.as_ref(), &self.metrics, &record.blob_key).await;
                    if outcome.is_success() {
                        report.reclaimed += 1;
                    } else {
                        report.failed += 1;
                    }
                }
                Ok(None) => {
                    debug!(token = %grant.token, "expired grant already removed");
                    report.already_gone += 1;
                }
                Err(e) => {
                    error!(token = %grant.token, error = %e, "janitor: failed to remove grant");
                    report.failed += 1;
                }
            }
        }

        self.metrics.increment_janitor_sweeps();
        if !report.is_empty() {
            info!(
                reclaimed = report.reclaimed,
                already_gone = report.already_gone,
                failed = report.failed,
                "janitor sweep complete"
            );
        }
        Ok(report)
    }

    /// Sweep on every interval tick until shutdown is signaled.
    pub async fn run(self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(interval_secs = self.interval.as_secs(), "janitor starting");

        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("janitor received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep().await {
                        error!(error = %e, "janitor sweep failed");
                    }
                }
            }
        }

        info!("janitor stopped");
    }

    /// Spawn [`run`](Self::run) on the current runtime.
    pub fn spawn(&self) -> JanitorHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let task = tokio::spawn(self.clone().run(shutdown_rx));
        JanitorHandle { shutdown_tx, task }
    }
}

impl fmt::Debug for Janitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Janitor")
            .field("clock", &self.clock)
            .field("interval", &self.interval)
            .finish_non_exhaustive()
    }
}

/// Handle to a running janitor task.
#[derive(Debug)]
pub struct JanitorHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl JanitorHandle {
    /// Signal shutdown and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Err(e) = self.task.await {
            error!(error = %e, "janitor task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use chrono::TimeDelta;
    use ephemera_core::{GrantRecord, ViewLimit};

    use super::*;
    use crate::ShareOptions;
    use crate::test_support::{Fixture, FlakyBlobStore};

    async fn upload(fx: &Fixture, limit: ViewLimit) -> GrantRecord {
        fx.coordinator()
            .upload(
                Bytes::from_static(b"img"),
                "image/jpeg",
                ShareOptions {
                    view_limit: limit,
                    ..ShareOptions::default()
                },
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn sweep_reclaims_only_expired_grants() {
        let fx = Fixture::new();
        let old = upload(&fx, ViewLimit::Unlimited).await;
        fx.clock.advance(TimeDelta::hours(20));
        let young = upload(&fx, ViewLimit::Limited(1)).await;
        fx.clock.advance(TimeDelta::hours(5));

        let report = fx.lifecycle.janitor.sweep().await.unwrap();
        assert_eq!(
            report,
            SweepReport {
                reclaimed: 1,
                already_gone: 0,
                failed: 0
            }
        );
        assert!(!fx.blob_exists(&old.blob_key).await);
        assert!(fx.blob_exists(&young.blob_key).await);
        assert!(fx.ledger.get(&young.token).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn second_sweep_is_a_no_op() {
        let fx = Fixture::new();
        upload(&fx, ViewLimit::Limited(3)).await;
        fx.clock.advance(TimeDelta::hours(24));

        let first = fx.lifecycle.janitor.sweep().await.unwrap();
        assert_eq!(first.reclaimed, 1);
        let second = fx.lifecycle.janitor.sweep().await.unwrap();
        assert!(second.is_empty());
        assert_eq!(fx.lifecycle.metrics().snapshot().janitor_sweeps, 2);
    }

    #[tokio::test]
    async fn blob_already_deleted_counts_as_reclaimed() {
        let fx = Fixture::new();
        let record = upload(&fx, ViewLimit::Limited(1)).await;
        fx.blobs.inner().delete(&record.blob_key).await.unwrap();
        fx.clock.advance(TimeDelta::hours(24));

        let report = fx.lifecycle.janitor.sweep().await.unwrap();
        assert_eq!(report.reclaimed, 1);
        assert_eq!(report.failed, 0);
    }

    #[tokio::test]
    async fn failed_deletes_do_not_abort_the_sweep() {
        let fx = Fixture::with_blobs(FlakyBlobStore::new().failing_deletes());
        for _ in 0..3 {
            upload(&fx, ViewLimit::Limited(1)).await;
        }
        fx.clock.advance(TimeDelta::hours(24));

        let report = fx.lifecycle.janitor.sweep().await.unwrap();
        assert_eq!(report.failed, 3);
        assert_eq!(fx.ledger.live_count().await.unwrap(), 0);
        assert_eq!(fx.lifecycle.metrics().snapshot().blob_delete_failures, 3);
    }

    #[tokio::test]
    async fn sweep_and_view_race_deletes_once() {
        let fx = Fixture::new();
        let record = upload(&fx, ViewLimit::Limited(2)).await;
        fx.clock.advance(TimeDelta::hours(24));

        let janitor = fx.lifecycle.janitor.clone();
        let coordinator = fx.coordinator().clone();
        let token = record.token.clone();
        let (swept, viewed) = tokio::join!(janitor.sweep(), coordinator.view(&token, None));

        let swept = swept.unwrap();
        match viewed {
            Err(LifecycleError::Expired) => assert_eq!(swept.reclaimed, 0),
            Err(LifecycleError::NotFound) => assert_eq!(swept.reclaimed, 1),
            other => panic!("unexpected view result: {other:?}"),
        }
        assert!(!fx.blob_exists(&record.blob_key).await);
        assert_eq!(fx.lifecycle.metrics().snapshot().blobs_deleted, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_sweeps_until_shutdown() {
        let fx = Fixture::new();
        upload(&fx, ViewLimit::Limited(1)).await;
        fx.clock.advance(TimeDelta::hours(24));

        let handle = fx.lifecycle.janitor.spawn();
        // The first tick fires immediately.
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(fx.ledger.live_count().await.unwrap(), 0);

        tokio::time::sleep(fx.lifecycle.janitor.interval()).await;
        handle.shutdown().await;
        assert!(fx.lifecycle.metrics().snapshot().janitor_sweeps >= 2);
    }
}
