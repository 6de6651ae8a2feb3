//! # kairos-primitives
//!
//! Primitive types shared by every Kairos crate: 20-byte addresses,
//! 32-byte hashes and the 256-bit unsigned integer used for nonces and
//! gas quantities.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod address;
mod error;
mod hash;

pub use address::{Address, AddressError};
pub use error::PrimitiveError;
pub use hash::{HashError, H256};

// Re-export primitive-types for U256
pub use primitive_types::U256;

/// Unix timestamp in whole seconds
pub type Timestamp = u64;

/// Strip an optional `0x`/`0X` prefix from a hex string
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}
