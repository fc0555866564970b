//! Shared fixtures: a blob store with injectable failures and a lifecycle
//! wired to a manual clock.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use ephemera_blob::{BlobError, BlobStore, MemoryBlobStore, StoredBlob};
use ephemera_core::ManualClock;
use ephemera_ledger_memory::MemoryGrantLedger;

use crate::{Lifecycle, LifecycleBuilder, LifecycleCoordinator};

#[derive(Debug, Default)]
pub(crate) struct FlakyBlobStore {
    inner: MemoryBlobStore,
    fail_gets: bool,
    fail_deletes: bool,
    get_delay: Option<Duration>,
}

impl FlakyBlobStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn failing_gets(mut self) -> Self {
        self.fail_gets = true;
        self
    }

    pub(crate) fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub(crate) fn slow_gets(mut self, delay: Duration) -> Self {
        self.get_delay = Some(delay);
        self
    }

    pub(crate) fn inner(&self) -> &MemoryBlobStore {
        &self.inner
    }
}

#[async_trait]
impl BlobStore for FlakyBlobStore {
    async fn put(&self, data: Bytes, content_type: &str) -> Result<String, BlobError> {
        self.inner.put(data, content_type).await
    }

    async fn get(&self, key: &str) -> Result<Option<StoredBlob>, BlobError> {
        if let Some(delay) = self.get_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_gets {
            return Err(BlobError::Connection("injected get failure".into()));
        }
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, BlobError> {
        if self.fail_deletes {
            return Err(BlobError::Storage("injected delete failure".into()));
        }
        self.inner.delete(key).await
    }

    async fn exists(&self, key: &str) -> Result<bool, BlobError> {
        self.inner.exists(key).await
    }
}

pub(crate) struct Fixture {
    pub(crate) lifecycle: Lifecycle,
    pub(crate) ledger: Arc<MemoryGrantLedger>,
    pub(crate) blobs: Arc<FlakyBlobStore>,
    pub(crate) clock: Arc<ManualClock>,
}

impl Fixture {
    pub(crate) fn new() -> Self {
        Self::with_blobs(FlakyBlobStore::new())
    }

    pub(crate) fn with_blobs(blobs: FlakyBlobStore) -> Self {
        let clock = Arc::new(ManualClock::default());
        let ledger = Arc::new(MemoryGrantLedger::new().with_clock(clock.clone()));
        let blobs = Arc::new(blobs);
        let lifecycle = LifecycleBuilder::new()
            .ledger(ledger.clone())
            .blob_store(blobs.clone())
            .clock(clock.clone())
            .build()
            .expect("lifecycle should build");
        Self {
            lifecycle,
            ledger,
            blobs,
            clock,
        }
    }

    pub(crate) fn coordinator(&self) -> &LifecycleCoordinator {
        &self.lifecycle.coordinator
    }

    pub(crate) async fn blob_exists(&self, key: &str) -> bool {
        self.blobs.inner().exists(key).await.unwrap()
    }
}
