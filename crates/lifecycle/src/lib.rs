//! View coordination and background reclamation for ephemera grants.
//!
//! [`LifecycleCoordinator`] drives uploads and views end-to-end against a
//! [`GrantLedger`](ephemera_ledger::GrantLedger) and a
//! [`BlobStore`](ephemera_blob::BlobStore). [`Janitor`] sweeps grants that
//! expired without anyone viewing them.

pub mod builder;
pub mod coordinator;
pub mod error;
pub mod janitor;
pub mod metrics;
pub mod reclaim;

#[cfg(test)]
mod test_support;

pub use builder::{DEFAULT_FETCH_TIMEOUT, DEFAULT_JANITOR_INTERVAL, Lifecycle, LifecycleBuilder};
pub use coordinator::{LifecycleCoordinator, ShareOptions, View};
pub use error::LifecycleError;
pub use janitor::{Janitor, JanitorHandle, SweepReport};
pub use metrics::{LifecycleMetrics, MetricsSnapshot};
pub use reclaim::ReclaimOutcome;
