//! In-memory operation store

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use kairos_primitives::{Address, Timestamp, H256};
use kairos_types::{ChainId, ScheduledRecord};

use crate::error::{StorageError, StorageResult};
use crate::traits::{due_cutoff, OperationStore};

/// Concurrent in-memory store, for tests and ephemeral runs
#[derive(Debug, Default)]
pub struct MemoryStore {
    by_hash: DashMap<H256, ScheduledRecord>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    /// Whether the store holds no records
    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }

    fn collect_sorted<F>(&self, filter: F) -> Vec<ScheduledRecord>
    where
        F: Fn(&ScheduledRecord) -> bool,
    {
        let mut records: Vec<ScheduledRecord> = self
            .by_hash
            .iter()
            .filter(|entry| filter(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();
        records.sort_by_key(|r| (r.valid_after(), r.hash));
        records
    }
}

#[async_trait]
impl OperationStore for MemoryStore {
    async fn save(&self, record: &ScheduledRecord) -> StorageResult<H256> {
        match self.by_hash.entry(record.hash) {
            Entry::Occupied(_) => Err(StorageError::AlreadyExists(record.hash)),
            Entry::Vacant(slot) => {
                slot.insert(record.clone());
                Ok(record.hash)
            }
        }
    }

    async fn list_due(
        &self,
        chain: ChainId,
        now: Timestamp,
        lookahead: Duration,
    ) -> StorageResult<Vec<ScheduledRecord>> {
        let cutoff = due_cutoff(now, lookahead);
        Ok(self.collect_sorted(|r| r.chain_id == chain && r.valid_after() <= cutoff))
    }

    async fn delete(&self, hash: &H256) -> StorageResult<bool> {
        Ok(self.by_hash.remove(hash).is_some())
    }

    async fn list_by_sender(
        &self,
        sender: &Address,
        chain: Option<ChainId>,
    ) -> StorageResult<Vec<ScheduledRecord>> {
        Ok(self.collect_sorted(|r| {
            r.sender() == *sender && chain.map_or(true, |c| r.chain_id == c)
        }))
    }

    async fn get(&self, hash: &H256) -> StorageResult<Option<ScheduledRecord>> {
        Ok(self.by_hash.get(hash).map(|entry| entry.value().clone()))
    }

    async fn chains_in_use(&self) -> StorageResult<BTreeSet<ChainId>> {
        Ok(self.by_hash.iter().map(|entry| entry.value().chain_id).collect())
    }
}
