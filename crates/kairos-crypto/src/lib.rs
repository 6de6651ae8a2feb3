//! # kairos-crypto
//!
//! Keccak-256 hashing used to derive user operation hashes.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod hash;

pub use hash::{keccak256, keccak256_concat};
