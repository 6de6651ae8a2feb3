//! # kairos-bundler
//!
//! Remote execution of user operations.
//!
//! - [`ExecutionClient`]: submit and gas-estimate contract
//! - [`HttpBundler`]: JSON-RPC client for ERC-4337 bundlers
//! - [`MockBundler`]: scripted client for tests

#![warn(missing_docs)]
#![warn(clippy::all)]

mod client;
mod error;
mod http;
mod mock;

pub use client::{with_dummy_signature, ExecutionClient, GasEstimate, DUMMY_SIGNATURE};
pub use error::{BundlerError, BundlerResult};
pub use http::{HttpBundler, DEFAULT_TIMEOUT};
pub use mock::{MockBundler, MockReply, SubmitCall};
