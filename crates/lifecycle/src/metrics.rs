use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters tracking upload, view and reclamation outcomes.
///
/// All counters use relaxed ordering. For a consistent point-in-time view,
/// call [`snapshot`](Self::snapshot).
#[derive(Debug, Default)]
pub struct LifecycleMetrics {
    /// Grants issued.
    pub uploads: AtomicU64,
    /// Views granted (one view spent each).
    pub views_allowed: AtomicU64,
    /// Views refused for any reason, including unknown tokens.
    pub views_denied: AtomicU64,
    /// Views refused because of a wrong PIN.
    pub pin_mismatches: AtomicU64,
    /// Blob fetches or stores that failed.
    pub storage_failures: AtomicU64,
    /// Limited grants whose last view was spent.
    pub grants_exhausted: AtomicU64,
    /// Grants removed because their window closed.
    pub grants_expired: AtomicU64,
    pub blobs_deleted: AtomicU64,
    /// Blob deletions that failed, leaving an orphaned object.
    pub blob_delete_failures: AtomicU64,
    pub janitor_sweeps: AtomicU64,
}

impl LifecycleMetrics {
    pub fn increment_uploads(&self) {
        self.uploads.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_views_allowed(&self) {
        self.views_allowed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_views_denied(&self) {
        self.views_denied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_pin_mismatches(&self) {
        self.pin_mismatches.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_storage_failures(&self) {
        self.storage_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_grants_exhausted(&self) {
        self.grants_exhausted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_grants_expired(&self) {
        self.grants_expired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_blobs_deleted(&self) {
        self.blobs_deleted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_blob_delete_failures(&self) {
        self.blob_delete_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_janitor_sweeps(&self) {
        self.janitor_sweeps.fetch_add(1, Ordering::Relaxed);
    }

    /// Take a point-in-time snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            uploads: self.uploads.load(Ordering::Relaxed),
            views_allowed: self.views_allowed.load(Ordering::Relaxed),
            views_denied: self.views_denied.load(Ordering::Relaxed),
            pin_mismatches: self.pin_mismatches.load(Ordering::Relaxed),
            storage_failures: self.storage_failures.load(Ordering::Relaxed),
            grants_exhausted: self.grants_exhausted.load(Ordering::Relaxed),
            grants_expired: self.grants_expired.load(Ordering::Relaxed),
            blobs_deleted: self.blobs_deleted.load(Ordering::Relaxed),
            blob_delete_failures: self.blob_delete_failures.load(Ordering::Relaxed),
            janitor_sweeps: self.janitor_sweeps.load(Ordering::Relaxed),
        }
    }
}

/// A plain data snapshot of [`LifecycleMetrics`] at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub uploads: u64,
    pub views_allowed: u64,
    pub views_denied: u64,
    pub pin_mismatches: u64,
    pub storage_failures: u64,
    pub grants_exhausted: u64,
    pub grants_expired: u64,
    pub blobs_deleted: u64,
    pub blob_delete_failures: u64,
    pub janitor_sweeps: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_reflects_increments() {
        let metrics = LifecycleMetrics::default();
        metrics.increment_uploads();
        metrics.increment_views_allowed();
        metrics.increment_views_allowed();
        metrics.increment_blob_delete_failures();

        let snap = metrics.snapshot();
        assert_eq!(snap.uploads, 1);
        assert_eq!(snap.views_allowed, 2);
        assert_eq!(snap.blob_delete_failures, 1);
        assert_eq!(snap.views_denied, 0);
    }
}
