//! Scripted execution client for tests

use std::collections::VecDeque;

use async_trait::async_trait;
use kairos_primitives::{Address, H256, U256};
use kairos_types::{ChainId, UserOperation};
use parking_lot::Mutex;

use crate::client::{ExecutionClient, GasEstimate};
use crate::error::{BundlerError, BundlerResult};

/// One scripted reply to `submit`
#[derive(Debug, Clone)]
pub enum MockReply {
    /// Accept and return the operation's own hash
    Accept,
    /// Fail with [`BundlerError::Rejected`]
    Reject(String),
}

/// A recorded `submit` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitCall {
    /// Hash of the submitted operation
    pub op_hash: H256,
    /// Target chain
    pub chain: ChainId,
}

/// Execution client that replays scripted replies and records every call
///
/// Once the script runs out every submission is accepted.
#[derive(Debug, Default)]
pub struct MockBundler {
    script: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<SubmitCall>>,
    estimates: Mutex<usize>,
}

impl MockBundler {
    /// Create a mock that accepts everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock that replays `replies` in order
    pub fn scripted(replies: impl IntoIterator<Item = MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Append a reply to the script
    pub fn push(&self, reply: MockReply) {
        self.script.lock().push_back(reply);
    }

    /// Every `submit` call so far
    pub fn calls(&self) -> Vec<SubmitCall> {
        self.calls.lock().clone()
    }

    /// Number of `submit` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Number of `estimate_gas` calls so far
    pub fn estimate_count(&self) -> usize {
        *self.estimates.lock()
    }
}

#[async_trait]
impl ExecutionClient for MockBundler {
    async fn submit(
        &self,
        op: &UserOperation,
        entry_point: &Address,
        chain: ChainId,
    ) -> BundlerResult<H256> {
        let op_hash = op.hash(entry_point, chain);
        self.calls.lock().push(SubmitCall { op_hash, chain });
        let reply = self.script.lock().pop_front().unwrap_or(MockReply::Accept);
        match reply {
            MockReply::Accept => Ok(op_hash),
            MockReply::Reject(reason) => Err(BundlerError::Rejected(reason)),
        }
    }

    async fn estimate_gas(
        &self,
        op: &UserOperation,
        _entry_point: &Address,
        _chain: ChainId,
    ) -> BundlerResult<GasEstimate> {
        *self.estimates.lock() += 1;
        Ok(GasEstimate {
            pre_verification_gas: op.pre_verification_gas,
            verification_gas_limit: op.verification_gas_limit,
            call_gas_limit: op.call_gas_limit,
            paymaster_verification_gas_limit: op.paymaster.map(|_| U256::from(50_000)),
            paymaster_post_op_gas_limit: None,
        })
    }
}
