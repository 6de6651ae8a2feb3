//! Shared fixtures for scheduler integration tests

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use kairos_primitives::{Address, Timestamp, H256, U256};
use kairos_scheduler::window::encode_prefix;
use kairos_scheduler::Clock;
use kairos_storage::{MemoryStore, OperationStore, StorageError, StorageResult};
use kairos_types::{ChainId, EntryPoint, ScheduledRecord, UserOperation, ValidityWindow};
use tokio::sync::Notify;

/// 2024-03-01T00:00:00Z, on a minute boundary
pub const NOW: Timestamp = 1_709_251_200;

/// Operation whose signature carries `(valid_after, valid_until)`
pub fn op_with_window(nonce: u64, valid_after: Timestamp, valid_until: Timestamp) -> UserOperation {
    let mut signature = hex_to_bytes(&encode_prefix(valid_after, valid_until));
    signature.extend_from_slice(&[0x5a; 65]);
    UserOperation {
        sender: Address::from_bytes([0x42; 20]),
        nonce: U256::from(nonce),
        factory: None,
        factory_data: None,
        call_data: Bytes::from_static(&[0xb6, 0x1d, 0x27, 0xf6]),
        call_gas_limit: U256::from(100_000),
        verification_gas_limit: U256::from(200_000),
        pre_verification_gas: U256::from(50_000),
        max_fee_per_gas: U256::from(2_000_000_000u64),
        max_priority_fee_per_gas: U256::from(1_000_000_000u64),
        paymaster: None,
        paymaster_verification_gas_limit: None,
        paymaster_post_op_gas_limit: None,
        paymaster_data: None,
        signature: Bytes::from(signature),
    }
}

/// Operation with an all-zero window prefix
pub fn op_without_window(nonce: u64) -> UserOperation {
    let mut op = op_with_window(nonce, 0, 1);
    let mut signature = vec![0u8; 12];
    signature.extend_from_slice(&[0x5a; 65]);
    op.signature = Bytes::from(signature);
    op
}

/// Record built straight from the operation's signature window
pub fn record(nonce: u64, chain: ChainId, valid_after: Timestamp, valid_until: Timestamp) -> ScheduledRecord {
    let window = ValidityWindow::new(valid_after, valid_until).unwrap();
    ScheduledRecord::new(
        op_with_window(nonce, valid_after, valid_until),
        EntryPoint::V07,
        chain,
        window,
    )
}

fn hex_to_bytes(s: &str) -> Vec<u8> {
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

/// Wall clock that follows tokio's (pausable) clock from a fixed origin
pub struct TokioClock {
    origin: Timestamp,
    start: tokio::time::Instant,
}

impl TokioClock {
    pub fn new(origin: Timestamp) -> Self {
        Self {
            origin,
            start: tokio::time::Instant::now(),
        }
    }
}

impl Clock for TokioClock {
    fn now(&self) -> Timestamp {
        self.origin + self.start.elapsed().as_secs()
    }
}

/// Memory store that counts calls and can fail or block on demand
#[derive(Default)]
pub struct InstrumentedStore {
    pub inner: MemoryStore,
    pub list_calls: AtomicUsize,
    pub delete_calls: AtomicUsize,
    /// Number of upcoming deletes that fail
    pub failing_deletes: AtomicUsize,
    /// Chain whose `list_due` always fails
    pub broken_chain: Option<ChainId>,
    /// When set, `list_due` signals `entered` and waits for `release`
    pub gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl InstrumentedStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated(entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        Self {
            gate: Some((entered, release)),
            ..Self::default()
        }
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OperationStore for InstrumentedStore {
    async fn save(&self, record: &ScheduledRecord) -> StorageResult<H256> {
        self.inner.save(record).await
    }

    async fn list_due(
        &self,
        chain: ChainId,
        now: Timestamp,
        lookahead: Duration,
    ) -> StorageResult<Vec<ScheduledRecord>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        if self.broken_chain == Some(chain) {
            return Err(StorageError::InvalidFormat("corrupt due index".to_string()));
        }
        self.inner.list_due(chain, now, lookahead).await
    }

    async fn delete(&self, hash: &H256) -> StorageResult<bool> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        let should_fail = self
            .failing_deletes
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if should_fail {
            return Err(StorageError::InvalidFormat("disk unavailable".to_string()));
        }
        self.inner.delete(hash).await
    }

    async fn list_by_sender(
        &self,
        sender: &Address,
        chain: Option<ChainId>,
    ) -> StorageResult<Vec<ScheduledRecord>> {
        self.inner.list_by_sender(sender, chain).await
    }

    async fn get(&self, hash: &H256) -> StorageResult<Option<ScheduledRecord>> {
        self.inner.get(hash).await
    }

    async fn chains_in_use(&self) -> StorageResult<BTreeSet<ChainId>> {
        self.inner.chains_in_use().await
    }
}
