//! # kairos-rpc
//!
//! HTTP surface of the scheduler.
//!
//! | route | |
//! |-------|-|
//! | `GET /ping` | liveness, answers `pong` |
//! | `POST /userop` | execute now or defer an operation |
//! | `GET /scheduled?sender=..&chainId=..` | deferred operations of a sender |
//! | `GET /metrics` | metrics snapshot |

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod server;
pub mod types;

pub use error::{ApiError, ErrorBody, RpcError, RpcResult};
pub use server::{ApiServer, AppState, ServerConfig};
