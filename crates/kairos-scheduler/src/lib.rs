//! # kairos-scheduler
//!
//! Deferred execution of ERC-4337 user operations.
//!
//! - [`window`]: validity windows carried in signatures
//! - [`RetryExecutor`]: bounded per-record retries
//! - [`Scheduler`]: the single-flighted periodic loop
//! - [`OperationIntake`]: execute-now-or-defer routing for new operations

#![warn(missing_docs)]
#![warn(clippy::all)]

mod clock;
mod error;
mod intake;
mod retry;
mod scheduler;
pub mod window;

pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{IntakeError, IntakeResult, WindowError, WindowResult};
pub use intake::{IntakeRequest, IntakeResponse, OperationIntake};
pub use retry::{RetryExecutor, RetryOutcome, RetryPolicy, MAX_RETRIES, RETRY_DELAY};
pub use scheduler::{ChainReport, Scheduler, SchedulerConfig, TickOutcome, TickReport};
