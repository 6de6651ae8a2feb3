//! # kairos-metrics
//!
//! In-process metrics for the scheduler and intake paths.
//!
//! - [`Metrics`]: named counters, gauges and latency histograms
//! - [`MetricsSnapshot`]: point-in-time JSON view served at `/metrics`
//! - [`names`]: the metric names the service records

#![warn(missing_docs)]
#![warn(clippy::all)]

mod collector;
mod export;
mod histogram;

pub use collector::Metrics;
pub use export::{HistogramSummary, MetricsSnapshot};
pub use histogram::Histogram;

/// Metric names recorded by the service
pub mod names {
    /// Ticks that ran
    pub const TICKS: &str = "scheduler.ticks";
    /// Ticks skipped because one was already in flight
    pub const TICKS_SKIPPED: &str = "scheduler.ticks_skipped";
    /// Due records found across all chains
    pub const OPS_FOUND: &str = "scheduler.ops_found";
    /// Records executed and deleted
    pub const OPS_SUCCEEDED: &str = "scheduler.ops_succeeded";
    /// Records deleted after their window closed
    pub const OPS_EXPIRED: &str = "scheduler.ops_expired";
    /// Records left in place because their window is not usable yet
    pub const OPS_SKIPPED: &str = "scheduler.ops_skipped";
    /// Records whose retries ran out this tick
    pub const OPS_EXHAUSTED: &str = "scheduler.ops_exhausted";
    /// Per-chain `list_due` failures
    pub const LIST_ERRORS: &str = "scheduler.list_errors";
    /// Due records found by the most recent tick
    pub const LAST_TICK_FOUND: &str = "scheduler.last_tick_found";
    /// Wall time of one tick, in milliseconds
    pub const TICK_MS: &str = "scheduler.tick_ms";
    /// Operations executed straight from intake
    pub const INTAKE_EXECUTED: &str = "intake.executed";
    /// Operations deferred at intake
    pub const INTAKE_DEFERRED: &str = "intake.deferred";
    /// Operations rejected at intake
    pub const INTAKE_REJECTED: &str = "intake.rejected";
}
