//! # kairos-types
//!
//! Core types for the Kairos scheduler.
//!
//! - [`UserOperation`]: an ERC-4337 v0.7 user operation and its hash
//! - [`ChainId`] / [`EntryPoint`]: the supported execution targets
//! - [`ValidityWindow`] / [`ScheduledRecord`]: a deferred operation as persisted
//! - [`quantity`] / [`hex_data`]: exact serde encodings for integers and byte strings

#![warn(missing_docs)]
#![warn(clippy::all)]

mod chain;
mod error;
pub mod hex_data;
pub mod quantity;
mod record;
mod user_operation;

pub use chain::{ChainId, EntryPoint};
pub use error::{TypeError, TypeResult};
pub use record::{ScheduledRecord, ValidityWindow};
pub use user_operation::{nonce_key, nonce_sequence, UserOperation};

pub use kairos_primitives::{Address, Timestamp, H256, U256};
