//! Supported chains and entry points

use std::fmt;
use std::str::FromStr;

use kairos_primitives::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Networks the scheduler can target
///
/// Variants are declared in id order, so the derived `Ord` sorts by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChainId {
    /// Ethereum mainnet
    Mainnet,
    /// Base
    Base,
    /// Arbitrum One
    Arbitrum,
}

impl ChainId {
    /// Every supported chain, in id order
    pub const ALL: [ChainId; 3] = [ChainId::Mainnet, ChainId::Base, ChainId::Arbitrum];

    /// Numeric EIP-155 chain id
    pub const fn id(self) -> u64 {
        match self {
            ChainId::Mainnet => 1,
            ChainId::Base => 8453,
            ChainId::Arbitrum => 42161,
        }
    }

    /// Short lowercase name
    pub const fn name(self) -> &'static str {
        match self {
            ChainId::Mainnet => "mainnet",
            ChainId::Base => "base",
            ChainId::Arbitrum => "arbitrum",
        }
    }
}

impl TryFrom<u64> for ChainId {
    type Error = TypeError;

    fn try_from(id: u64) -> Result<Self, Self::Error> {
        match id {
            1 => Ok(ChainId::Mainnet),
            8453 => Ok(ChainId::Base),
            42161 => Ok(ChainId::Arbitrum),
            other => Err(TypeError::UnsupportedChain(other)),
        }
    }
}

impl From<ChainId> for u64 {
    fn from(chain: ChainId) -> Self {
        chain.id()
    }
}

impl FromStr for ChainId {
    type Err = TypeError;

    /// Accepts either the numeric id or the short name
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(id) = s.parse::<u64>() {
            return ChainId::try_from(id);
        }
        ChainId::ALL
            .into_iter()
            .find(|chain| chain.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| TypeError::UnknownChainName(s.to_string()))
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.id())
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.id())
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let id = u64::deserialize(deserializer)?;
        ChainId::try_from(id).map_err(serde::de::Error::custom)
    }
}

/// ERC-4337 entry point contracts
pub struct EntryPoint;

impl EntryPoint {
    /// Canonical v0.7 entry point address
    pub const V07: Address = Address::from_bytes([
        0x00, 0x00, 0x00, 0x00, 0x71, 0x72, 0x7d, 0xe2, 0x2e, 0x5e, 0x9d, 0x8b, 0xaf, 0x0e,
        0xda, 0xc6, 0xf3, 0x7d, 0xa0, 0x32,
    ]);

    /// Whether `address` is an entry point this service accepts
    pub fn is_supported(address: &Address) -> bool {
        *address == Self::V07
    }
}
