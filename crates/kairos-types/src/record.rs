//! Validity windows and persisted deferred operations

use kairos_primitives::{Address, Timestamp, H256, U256};
use serde::{Deserialize, Serialize};

use crate::chain::ChainId;
use crate::error::{TypeError, TypeResult};
use crate::quantity;
use crate::user_operation::UserOperation;

/// Inclusive `[valid_after, valid_until]` range, in unix seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidityWindow {
    /// First second the operation may execute
    pub valid_after: Timestamp,
    /// Last second the operation may execute
    pub valid_until: Timestamp,
}

impl ValidityWindow {
    /// Build a window, rejecting `valid_after >= valid_until`
    pub fn new(valid_after: Timestamp, valid_until: Timestamp) -> TypeResult<Self> {
        if valid_after >= valid_until {
            return Err(TypeError::InvalidWindow {
                valid_after,
                valid_until,
            });
        }
        Ok(Self {
            valid_after,
            valid_until,
        })
    }

    /// Whether `now` lies inside the window (both ends inclusive)
    pub fn contains(&self, now: Timestamp) -> bool {
        self.valid_after <= now && now <= self.valid_until
    }

    /// Whether the window has closed at `now`
    pub fn is_expired(&self, now: Timestamp) -> bool {
        self.valid_until < now
    }
}

/// A deferred operation as persisted by the operation store
///
/// Records are immutable: they are written once at intake and removed once,
/// either after execution or when found expired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledRecord {
    /// `userOpHash`, the unique key
    pub hash: H256,
    /// Target chain
    pub chain_id: ChainId,
    /// Entry point the hash was computed against
    pub entry_point: Address,
    /// Nonce key, denormalised for the query surface
    #[serde(with = "quantity")]
    pub key: U256,
    /// The operation, forwarded verbatim on execution
    pub userop: UserOperation,
    /// Window extracted at intake
    #[serde(flatten)]
    pub window: ValidityWindow,
}

impl ScheduledRecord {
    /// Build a record, deriving its hash and nonce key from the operation
    pub fn new(
        userop: UserOperation,
        entry_point: Address,
        chain_id: ChainId,
        window: ValidityWindow,
    ) -> Self {
        Self {
            hash: userop.hash(&entry_point, chain_id),
            chain_id,
            entry_point,
            key: userop.key(),
            userop,
            window,
        }
    }

    /// Sender of the wrapped operation
    pub fn sender(&self) -> Address {
        self.userop.sender
    }

    /// Lower window bound
    pub fn valid_after(&self) -> Timestamp {
        self.window.valid_after
    }

    /// Upper window bound
    pub fn valid_until(&self) -> Timestamp {
        self.window.valid_until
    }
}
