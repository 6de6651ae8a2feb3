//! The execution client contract

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use kairos_primitives::{Address, H256, U256};
use kairos_types::{quantity, ChainId, UserOperation};
use serde::{Deserialize, Serialize};

use crate::error::BundlerResult;

/// Zero validity window followed by a structurally valid ECDSA signature.
///
/// Swapped into an operation for gas estimation, so simulation does not
/// fail on a window that has not opened yet.
pub const DUMMY_SIGNATURE: [u8; 77] = [
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xf0, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x7a, 0xaa, 0xaa, 0xaa,
    0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
    0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa, 0xaa,
    0xaa, 0xaa, 0xaa, 0xaa, 0x1c,
];

/// Copy of `op` carrying [`DUMMY_SIGNATURE`]
pub fn with_dummy_signature(op: &UserOperation) -> UserOperation {
    UserOperation {
        signature: Bytes::from_static(&DUMMY_SIGNATURE),
        ..op.clone()
    }
}

/// Gas limits suggested by `eth_estimateUserOperationGas`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEstimate {
    /// Suggested pre-verification gas
    #[serde(with = "quantity")]
    pub pre_verification_gas: U256,
    /// Suggested verification gas limit
    #[serde(with = "quantity")]
    pub verification_gas_limit: U256,
    /// Suggested call gas limit
    #[serde(with = "quantity")]
    pub call_gas_limit: U256,
    /// Suggested paymaster verification gas limit
    #[serde(default, skip_serializing_if = "Option::is_none", with = "quantity::option")]
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Suggested paymaster post-op gas limit
    #[serde(default, skip_serializing_if = "Option::is_none", with = "quantity::option")]
    pub paymaster_post_op_gas_limit: Option<U256>,
}

/// Remote execution of user operations (object-safe)
///
/// Implementations make exactly one remote call per method; retrying is
/// the caller's job.
#[async_trait]
pub trait ExecutionClient: Send + Sync {
    /// Submit an operation, returning the hash the bundler assigned it
    async fn submit(
        &self,
        op: &UserOperation,
        entry_point: &Address,
        chain: ChainId,
    ) -> BundlerResult<H256>;

    /// Ask the bundler for gas limits; diagnostics only
    async fn estimate_gas(
        &self,
        op: &UserOperation,
        entry_point: &Address,
        chain: ChainId,
    ) -> BundlerResult<GasEstimate>;
}

#[async_trait]
impl<T: ExecutionClient + ?Sized> ExecutionClient for Arc<T> {
    async fn submit(
        &self,
        op: &UserOperation,
        entry_point: &Address,
        chain: ChainId,
    ) -> BundlerResult<H256> {
        (**self).submit(op, entry_point, chain).await
    }

    async fn estimate_gas(
        &self,
        op: &UserOperation,
        entry_point: &Address,
        chain: ChainId,
    ) -> BundlerResult<GasEstimate> {
        (**self).estimate_gas(op, entry_point, chain).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dummy_signature_has_zero_window() {
        assert!(DUMMY_SIGNATURE[..12].iter().all(|b| *b == 0));
        assert_eq!(DUMMY_SIGNATURE.len() - 12, 65);
        assert_eq!(DUMMY_SIGNATURE[76], 0x1c);
    }

    #[test]
    fn test_gas_estimate_decodes_hex() {
        let json = r#"{
            "preVerificationGas": "0xb708",
            "verificationGasLimit": "0x16c23",
            "callGasLimit": "0x2a3b"
        }"#;
        let estimate: GasEstimate = serde_json::from_str(json).unwrap();
        assert_eq!(estimate.pre_verification_gas, U256::from(0xb708));
        assert_eq!(estimate.call_gas_limit, U256::from(0x2a3b));
        assert_eq!(estimate.paymaster_post_op_gas_limit, None);
    }
}
