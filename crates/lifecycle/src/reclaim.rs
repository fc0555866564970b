use tracing::{debug, error};

use ephemera_blob::BlobStore;

use crate::metrics::LifecycleMetrics;

/// Result of deleting the blob behind a removed grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReclaimOutcome {
    Deleted,
    /// Someone else deleted it first.
    AlreadyGone,
    /// The delete failed; the object is orphaned in the blob store.
    Failed,
}

impl ReclaimOutcome {
    /// `true` unless the blob store reported an error.
    pub fn is_success(self) -> bool {
        !matches!(self, Self::Failed)
    }
}

/// Delete the blob behind a grant that was just removed from the ledger.
///
/// Only the caller that won the ledger removal may call this. Errors are
/// logged and counted, never propagated.
pub(crate) async fn reclaim_blob(
    blobs: &dyn BlobStore,
    metrics: &LifecycleMetrics,
    blob_key: &str,
) -> ReclaimOutcome {
    match blobs.delete(blob_key).await {
        Ok(true) => {
            metrics.increment_blobs_deleted();
            debug!(blob_key, "blob deleted");
            ReclaimOutcome::Deleted
        }
        Ok(false) => {
            debug!(blob_key, "blob already gone");
            ReclaimOutcome::AlreadyGone
        }
        Err(e) => {
            metrics.increment_blob_delete_failures();
            error!(blob_key, error = %e, "failed to delete blob, object orphaned");
            ReclaimOutcome::Failed
        }
    }
}
