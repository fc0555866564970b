use std::sync::Arc;
use std::time::Duration;

use ephemera_blob::BlobStore;
use ephemera_core::{Clock, SystemClock};
use ephemera_ledger::GrantLedger;

use crate::coordinator::LifecycleCoordinator;
use crate::error::LifecycleError;
use crate::janitor::Janitor;
use crate::metrics::LifecycleMetrics;

/// Default bound on a single blob fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default time between janitor sweeps.
pub const DEFAULT_JANITOR_INTERVAL: Duration = Duration::from_secs(300);

/// A coordinator and janitor sharing one ledger, blob store and metrics.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    pub coordinator: LifecycleCoordinator,
    pub janitor: Janitor,
}

impl Lifecycle {
    pub fn metrics(&self) -> &Arc<LifecycleMetrics> {
        self.coordinator.metrics()
    }
}

/// Builder for [`Lifecycle`].
pub struct LifecycleBuilder {
    ledger: Option<Arc<dyn GrantLedger>>,
    blobs: Option<Arc<dyn BlobStore>>,
    clock: Option<Arc<dyn Clock>>,
    metrics: Option<Arc<LifecycleMetrics>>,
    fetch_timeout: Duration,
    janitor_interval: Duration,
}

impl LifecycleBuilder {
    pub fn new() -> Self {
        Self {
            ledger: None,
            blobs: None,
            clock: None,
            metrics: None,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            janitor_interval: DEFAULT_JANITOR_INTERVAL,
        }
    }

    /// Set the grant ledger (required).
    #[must_use]
    pub fn ledger(mut self, ledger: Arc<dyn GrantLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Set the blob store (required).
    #[must_use]
    pub fn blob_store(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = Some(blobs);
        self
    }

    /// Clock used for expiry decisions. Defaults to [`SystemClock`].
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn metrics(mut self, metrics: Arc<LifecycleMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    #[must_use]
    pub fn fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    #[must_use]
    pub fn janitor_interval(mut self, interval: Duration) -> Self {
        self.janitor_interval = interval;
        self
    }

    /// Build the coordinator and janitor.
    pub fn build(self) -> Result<Lifecycle, LifecycleError> {
        let ledger = self
            .ledger
            .ok_or_else(|| LifecycleError::Configuration("grant ledger is required".into()))?;
        let blobs = self
            .blobs
            .ok_or_else(|| LifecycleError::Configuration("blob store is required".into()))?;
        if self.fetch_timeout.is_zero() {
            return Err(LifecycleError::Configuration(
                "fetch timeout must be greater than zero".into(),
            ));
        }
        if self.janitor_interval.is_zero() {
            return Err(LifecycleError::Configuration(
                "janitor interval must be greater than zero".into(),
            ));
        }

        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let metrics = self.metrics.unwrap_or_default();

        let coordinator = LifecycleCoordinator::new(
            Arc::clone(&ledger),
            Arc::clone(&blobs),
            Arc::clone(&clock),
            Arc::clone(&metrics),
            self.fetch_timeout,
        );
        let janitor = Janitor::new(ledger, blobs, clock, metrics, self.janitor_interval);

        Ok(Lifecycle {
            coordinator,
            janitor,
        })
    }
}

impl Default for LifecycleBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use ephemera_blob::MemoryBlobStore;
    use ephemera_ledger_memory::MemoryGrantLedger;

    use super::*;

    #[test]
    fn missing_ledger_is_a_configuration_error() {
        let err = LifecycleBuilder::new()
            .blob_store(Arc::new(MemoryBlobStore::new()))
            .build()
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration(msg) if msg.contains("ledger")));
    }

    #[test]
    fn zero_interval_is_rejected() {
        let err = LifecycleBuilder::new()
            .ledger(Arc::new(MemoryGrantLedger::new()))
            .blob_store(Arc::new(MemoryBlobStore::new()))
            .janitor_interval(Duration::ZERO)
            .build()
            .unwrap_err();
        assert!(matches!(err, LifecycleError::Configuration(_)));
    }

    #[test]
    fn components_share_metrics() {
        let metrics = Arc::new(LifecycleMetrics::default());
        let lifecycle = LifecycleBuilder::new()
            .ledger(Arc::new(MemoryGrantLedger::new()))
            .blob_store(Arc::new(MemoryBlobStore::new()))
            .metrics(Arc::clone(&metrics))
            .build()
            .unwrap();
        assert!(Arc::ptr_eq(lifecycle.metrics(), &metrics));
        assert_eq!(lifecycle.janitor.interval(), DEFAULT_JANITOR_INTERVAL);
    }
}
