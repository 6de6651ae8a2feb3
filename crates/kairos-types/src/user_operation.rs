//! ERC-4337 v0.7 user operation

use bytes::{BufMut, Bytes, BytesMut};
use kairos_crypto::{keccak256, keccak256_concat};
use kairos_primitives::{Address, H256, U256};
use serde::{Deserialize, Serialize};

use crate::chain::ChainId;
use crate::error::{TypeError, TypeResult};
use crate::{hex_data, quantity};

/// Nonce key: the upper 192 bits of a 4337 nonce
pub fn nonce_key(nonce: U256) -> U256 {
    nonce >> 64
}

/// Nonce sequence: the lower 64 bits of a 4337 nonce
pub fn nonce_sequence(nonce: U256) -> u64 {
    nonce.low_u64()
}

/// User operation in the unpacked v0.7 RPC shape
///
/// Gas and fee fields are forwarded untouched; the scheduler only reads
/// `sender`, `nonce` and `signature`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperation {
    /// Smart account address
    pub sender: Address,
    /// Anti-replay nonce (key << 64 | sequence)
    #[serde(with = "quantity")]
    pub nonce: U256,
    /// Account factory, when the account is not yet deployed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory: Option<Address>,
    /// Factory calldata
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_data::option")]
    pub factory_data: Option<Bytes>,
    /// Calldata executed by the account
    #[serde(with = "hex_data")]
    pub call_data: Bytes,
    /// Gas for the main execution call
    #[serde(with = "quantity")]
    pub call_gas_limit: U256,
    /// Gas for the verification step
    #[serde(with = "quantity")]
    pub verification_gas_limit: U256,
    /// Gas paid to the bundler for calldata and overhead
    #[serde(with = "quantity")]
    pub pre_verification_gas: U256,
    /// EIP-1559 max fee
    #[serde(with = "quantity")]
    pub max_fee_per_gas: U256,
    /// EIP-1559 priority fee
    #[serde(with = "quantity")]
    pub max_priority_fee_per_gas: U256,
    /// Paymaster sponsoring the operation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster: Option<Address>,
    /// Gas for paymaster validation
    #[serde(default, skip_serializing_if = "Option::is_none", with = "quantity::option")]
    pub paymaster_verification_gas_limit: Option<U256>,
    /// Gas for the paymaster post-op call
    #[serde(default, skip_serializing_if = "Option::is_none", with = "quantity::option")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    /// Paymaster-specific data
    #[serde(default, skip_serializing_if = "Option::is_none", with = "hex_data::option")]
    pub paymaster_data: Option<Bytes>,
    /// Account signature; its first 12 bytes carry the validity window
    #[serde(with = "hex_data")]
    pub signature: Bytes,
}

impl UserOperation {
    /// Nonce key (upper 192 bits)
    pub fn key(&self) -> U256 {
        nonce_key(self.nonce)
    }

    /// Nonce sequence (lower 64 bits)
    pub fn sequence(&self) -> u64 {
        nonce_sequence(self.nonce)
    }

    /// Signature as a `0x` hex string, the form the window extractor reads
    pub fn signature_hex(&self) -> String {
        hex_data::to_hex(&self.signature)
    }

    /// Check the fields that get packed into fixed-width slots
    pub fn validate(&self) -> TypeResult<()> {
        let u128_max = U256::from(u128::MAX);
        let packed = [
            ("callGasLimit", Some(self.call_gas_limit)),
            ("verificationGasLimit", Some(self.verification_gas_limit)),
            ("maxFeePerGas", Some(self.max_fee_per_gas)),
            ("maxPriorityFeePerGas", Some(self.max_priority_fee_per_gas)),
            ("paymasterVerificationGasLimit", self.paymaster_verification_gas_limit),
            ("paymasterPostOpGasLimit", self.paymaster_post_op_gas_limit),
        ];
        for (field, value) in packed {
            if value.is_some_and(|v| v > u128_max) {
                return Err(TypeError::GasFieldTooLarge { field });
            }
        }

        if self.paymaster.is_none()
            && (self.paymaster_verification_gas_limit.is_some()
                || self.paymaster_post_op_gas_limit.is_some()
                || self.paymaster_data.is_some())
        {
            return Err(TypeError::InconsistentFields(
                "paymaster fields set without a paymaster",
            ));
        }
        if self.factory.is_none() && self.factory_data.as_ref().is_some_and(|d| !d.is_empty()) {
            return Err(TypeError::InconsistentFields(
                "factoryData set without a factory",
            ));
        }
        Ok(())
    }

    /// `factory ++ factoryData`, or empty when there is no factory
    pub fn init_code(&self) -> Bytes {
        match self.factory {
            Some(factory) => {
                let data = self.factory_data.clone().unwrap_or_default();
                let mut buf = BytesMut::with_capacity(Address::LEN + data.len());
                buf.put_slice(factory.as_bytes());
                buf.put_slice(&data);
                buf.freeze()
            }
            None => Bytes::new(),
        }
    }

    /// `paymaster ++ uint128(verificationGas) ++ uint128(postOpGas) ++ paymasterData`
    pub fn paymaster_and_data(&self) -> Bytes {
        match self.paymaster {
            Some(paymaster) => {
                let data = self.paymaster_data.clone().unwrap_or_default();
                let mut buf = BytesMut::with_capacity(Address::LEN + 32 + data.len());
                buf.put_slice(paymaster.as_bytes());
                buf.put_slice(&low_u128_bytes(
                    self.paymaster_verification_gas_limit.unwrap_or_default(),
                ));
                buf.put_slice(&low_u128_bytes(
                    self.paymaster_post_op_gas_limit.unwrap_or_default(),
                ));
                buf.put_slice(&data);
                buf.freeze()
            }
            None => Bytes::new(),
        }
    }

    /// `verificationGasLimit << 128 | callGasLimit`
    pub fn account_gas_limits(&self) -> U256 {
        pack_u128_pair(self.verification_gas_limit, self.call_gas_limit)
    }

    /// `maxPriorityFeePerGas << 128 | maxFeePerGas`
    pub fn gas_fees(&self) -> U256 {
        pack_u128_pair(self.max_priority_fee_per_gas, self.max_fee_per_gas)
    }

    /// ABI-encoded packed operation, without the signature
    fn encode_packed(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(8 * 32);
        out.extend_from_slice(&address_word(&self.sender));
        out.extend_from_slice(&u256_word(self.nonce));
        out.extend_from_slice(keccak256(&self.init_code()).as_bytes());
        out.extend_from_slice(keccak256(&self.call_data).as_bytes());
        out.extend_from_slice(&u256_word(self.account_gas_limits()));
        out.extend_from_slice(&u256_word(self.pre_verification_gas));
        out.extend_from_slice(&u256_word(self.gas_fees()));
        out.extend_from_slice(keccak256(&self.paymaster_and_data()).as_bytes());
        out
    }

    /// Entry point v0.7 `getUserOpHash`
    ///
    /// `keccak256(abi.encode(keccak256(pack(op)), entryPoint, chainId))`.
    /// The signature is excluded, so the hash is stable for the life of the
    /// operation.
    pub fn hash(&self, entry_point: &Address, chain: ChainId) -> H256 {
        let inner = keccak256(&self.encode_packed());
        keccak256_concat(&[
            inner.as_bytes(),
            &address_word(entry_point),
            &u256_word(U256::from(chain.id())),
        ])
    }
}

fn u256_word(value: U256) -> [u8; 32] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    word
}

fn address_word(address: &Address) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

fn low_u128_bytes(value: U256) -> [u8; 16] {
    let word = u256_word(value);
    let mut out = [0u8; 16];
    out.copy_from_slice(&word[16..]);
    out
}

fn pack_u128_pair(high: U256, low: U256) -> U256 {
    let mask = U256::from(u128::MAX);
    ((high & mask) << 128) | (low & mask)
}
