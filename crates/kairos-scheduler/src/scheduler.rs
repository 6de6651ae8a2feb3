//! The recurring, single-flighted scheduling loop

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use kairos_metrics::{names, Metrics};
use kairos_primitives::{Timestamp, H256};
use kairos_storage::OperationStore;
use kairos_types::ChainId;
use tokio::sync::{watch, Semaphore};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::retry::{RetryExecutor, RetryOutcome};

/// Scheduler configuration
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Chains polled every tick, in order
    pub chains: Vec<ChainId>,
    /// How far ahead of `now` a window may open and still be picked up
    pub lookahead: Duration,
    /// Time between ticks; ticks land on multiples of it
    pub tick_interval: Duration,
    /// Cap on concurrently executing records within a tick
    pub max_concurrent_executions: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            chains: ChainId::ALL.to_vec(),
            lookahead: Duration::from_secs(30 * 60),
            tick_interval: Duration::from_secs(60),
            max_concurrent_executions: 16,
        }
    }
}

/// Per-chain results of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChainReport {
    /// Records returned by `list_due`
    pub found: usize,
    /// Submitted and deleted
    pub succeeded: usize,
    /// Deleted as expired
    pub expired: usize,
    /// Left in place, window unusable
    pub skipped: usize,
    /// Left in place, retries used up
    pub exhausted: usize,
    /// Execution tasks that panicked
    pub aborted: usize,
    /// `list_due` failed for this chain
    pub list_failed: bool,
}

impl ChainReport {
    fn record(&mut self, outcome: &RetryOutcome) {
        match outcome {
            RetryOutcome::Succeeded { .. } => self.succeeded += 1,
            RetryOutcome::Expired => self.expired += 1,
            RetryOutcome::Skipped(_) => self.skipped += 1,
            RetryOutcome::Exhausted { .. } => self.exhausted += 1,
        }
    }

    /// Records that did not succeed
    pub fn failed(&self) -> usize {
        self.found - self.succeeded
    }
}

/// Results of one completed tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Time the tick started at
    pub started_at: Timestamp,
    /// One entry per polled chain
    pub chains: Vec<(ChainId, ChainReport)>,
}

impl TickReport {
    /// Records found across chains
    pub fn found(&self) -> usize {
        self.chains.iter().map(|(_, r)| r.found).sum()
    }

    /// Records executed across chains
    pub fn succeeded(&self) -> usize {
        self.chains.iter().map(|(_, r)| r.succeeded).sum()
    }

    /// Report for one chain
    pub fn chain(&self, chain: ChainId) -> Option<&ChainReport> {
        self.chains.iter().find(|(c, _)| *c == chain).map(|(_, r)| r)
    }
}

/// What a trigger did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Another tick was in flight; nothing happened
    Skipped,
    /// The tick ran
    Completed(TickReport),
}

/// Clears the in-progress flag on every exit path
struct TickGuard<'a>(&'a AtomicBool);

impl Drop for TickGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Periodically moves due records from the store to the execution client
pub struct Scheduler {
    store: Arc<dyn OperationStore>,
    executor: RetryExecutor,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    config: SchedulerConfig,
    tick_in_progress: AtomicBool,
}

impl Scheduler {
    /// Create a scheduler
    pub fn new(
        store: Arc<dyn OperationStore>,
        executor: RetryExecutor,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            store,
            executor,
            clock,
            metrics,
            config,
            tick_in_progress: AtomicBool::new(false),
        }
    }

    /// Configuration in use
    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// Whether a tick is running right now
    pub fn is_ticking(&self) -> bool {
        self.tick_in_progress.load(Ordering::Acquire)
    }

    /// Run one tick, unless one is already running
    pub async fn trigger(&self) -> TickOutcome {
        if self
            .tick_in_progress
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!("previous tick still running, skipping this one");
            self.metrics.incr(names::TICKS_SKIPPED);
            return TickOutcome::Skipped;
        }
        let _guard = TickGuard(&self.tick_in_progress);

        let started = Instant::now();
        let report = self.tick().await;
        self.metrics.incr(names::TICKS);
        self.metrics
            .gauge(names::LAST_TICK_FOUND, i64::try_from(report.found()).unwrap_or(i64::MAX));
        self.metrics.record_duration(names::TICK_MS, started.elapsed());
        TickOutcome::Completed(report)
    }

    async fn tick(&self) -> TickReport {
        let now = self.clock.now();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_executions.max(1)));
        let mut report = TickReport {
            started_at: now,
            chains: Vec::with_capacity(self.config.chains.len()),
        };

        for &chain in &self.config.chains {
            let chain_report = self.run_chain(chain, now, &semaphore).await;
            report.chains.push((chain, chain_report));
        }
        report
    }

    async fn run_chain(&self, chain: ChainId, now: Timestamp, semaphore: &Arc<Semaphore>) -> ChainReport {
        let mut report = ChainReport::default();
        let records = match self.store.list_due(chain, now, self.config.lookahead).await {
            Ok(records) => records,
            Err(e) => {
                error!(%chain, error = %e, "failed to list due operations");
                self.metrics.incr(names::LIST_ERRORS);
                report.list_failed = true;
                return report;
            }
        };
        report.found = records.len();
        self.metrics.counter(names::OPS_FOUND, records.len() as u64);
        info!(%chain, count = records.len(), "found operations to process");

        let mut tasks: JoinSet<(H256, RetryOutcome)> = JoinSet::new();
        for record in records {
            // acquiring before spawning starts records in valid_after order
            let Ok(permit) = Arc::clone(semaphore).acquire_owned().await else {
                break;
            };
            let executor = self.executor.clone();
            tasks.spawn(async move {
                let outcome = executor.execute(&record).await;
                drop(permit);
                (record.hash, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((_, outcome)) => {
                    self.metrics.incr(outcome_metric(&outcome));
                    report.record(&outcome);
                }
                Err(e) => {
                    error!(%chain, error = %e, "execution task aborted");
                    report.aborted += 1;
                }
            }
        }

        info!(
            %chain,
            succeeded = report.succeeded,
            total = report.found,
            "successfully executed {} out of {} operations",
            report.succeeded,
            report.found
        );
        report
    }

    /// Tick on every interval boundary until `shutdown` flips to true
    ///
    /// An in-flight tick is allowed to finish before this returns.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let first = tokio::time::Instant::now() + self.delay_to_boundary();
        let mut ticker = tokio::time::interval_at(first, self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut ticks: JoinSet<TickOutcome> = JoinSet::new();

        info!(
            chains = ?self.config.chains,
            interval_secs = self.config.tick_interval.as_secs(),
            "scheduler started"
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let this = Arc::clone(&self);
                    ticks.spawn(async move { this.trigger().await });
                }
                Some(finished) = ticks.join_next(), if !ticks.is_empty() => {
                    if let Err(e) = finished {
                        error!(error = %e, "tick task aborted");
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("scheduler stopping");
                        break;
                    }
                }
            }
        }

        while let Some(finished) = ticks.join_next().await {
            if let Err(e) = finished {
                error!(error = %e, "tick task aborted during shutdown");
            }
        }
        info!("scheduler stopped");
    }

    /// Time until the next multiple of the tick interval (top of the minute by default)
    fn delay_to_boundary(&self) -> Duration {
        let interval = self.config.tick_interval.as_secs().max(1);
        let into = self.clock.now() % interval;
        Duration::from_secs(if into == 0 { 0 } else { interval - into })
    }
}

fn outcome_metric(outcome: &RetryOutcome) -> &'static str {
    match outcome {
        RetryOutcome::Succeeded { .. } => names::OPS_SUCCEEDED,
        RetryOutcome::Expired => names::OPS_EXPIRED,
        RetryOutcome::Skipped(_) => names::OPS_SKIPPED,
        RetryOutcome::Exhausted { .. } => names::OPS_EXHAUSTED,
    }
}
