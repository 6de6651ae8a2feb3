//! The operation store contract

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kairos_primitives::{Address, Timestamp, H256};
use kairos_types::{ChainId, ScheduledRecord};

use crate::error::StorageResult;

/// Persistence for deferred operations, keyed by operation hash
///
/// Every method is atomic with respect to the others: a record is either
/// fully visible through all queries or not at all.
#[async_trait]
pub trait OperationStore: Send + Sync {
    /// Insert a record, failing with `AlreadyExists` if its hash is taken
    async fn save(&self, record: &ScheduledRecord) -> StorageResult<H256>;

    /// Records of `chain` whose window opens at or before `now + lookahead`,
    /// ordered by `valid_after` ascending
    async fn list_due(
        &self,
        chain: ChainId,
        now: Timestamp,
        lookahead: Duration,
    ) -> StorageResult<Vec<ScheduledRecord>>;

    /// Remove a record; `false` when nothing was stored under `hash`
    async fn delete(&self, hash: &H256) -> StorageResult<bool>;

    /// Records submitted by `sender`, optionally restricted to one chain
    async fn list_by_sender(
        &self,
        sender: &Address,
        chain: Option<ChainId>,
    ) -> StorageResult<Vec<ScheduledRecord>>;

    /// Look up a single record
    async fn get(&self, hash: &H256) -> StorageResult<Option<ScheduledRecord>>;

    /// Chains that currently have at least one stored record
    async fn chains_in_use(&self) -> StorageResult<BTreeSet<ChainId>>;
}

#[async_trait]
impl<T: OperationStore + ?Sized> OperationStore for Arc<T> {
    async fn save(&self, record: &ScheduledRecord) -> StorageResult<H256> {
        (**self).save(record).await
    }

    async fn list_due(
        &self,
        chain: ChainId,
        now: Timestamp,
        lookahead: Duration,
    ) -> StorageResult<Vec<ScheduledRecord>> {
        (**self).list_due(chain, now, lookahead).await
    }

    async fn delete(&self, hash: &H256) -> StorageResult<bool> {
        (**self).delete(hash).await
    }

    async fn list_by_sender(
        &self,
        sender: &Address,
        chain: Option<ChainId>,
    ) -> StorageResult<Vec<ScheduledRecord>> {
        (**self).list_by_sender(sender, chain).await
    }

    async fn get(&self, hash: &H256) -> StorageResult<Option<ScheduledRecord>> {
        (**self).get(hash).await
    }

    async fn chains_in_use(&self) -> StorageResult<BTreeSet<ChainId>> {
        (**self).chains_in_use().await
    }
}

/// Upper bound for `list_due`, saturating instead of wrapping
pub(crate) fn due_cutoff(now: Timestamp, lookahead: Duration) -> Timestamp {
    now.saturating_add(lookahead.as_secs())
}
