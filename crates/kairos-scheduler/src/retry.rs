//! Bounded retries for one deferred record

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use kairos_bundler::ExecutionClient;
use kairos_primitives::H256;
use kairos_storage::OperationStore;
use kairos_types::ScheduledRecord;
use tracing::{debug, error, info, warn};

use crate::clock::Clock;
use crate::error::WindowError;
use crate::window;

/// Attempts per record per tick
pub const MAX_RETRIES: u32 = 3;

/// Pause between failed attempts
pub const RETRY_DELAY: Duration = Duration::from_millis(5_000);

/// Retry limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts before giving up for this tick
    pub max_retries: u32,
    /// Fixed delay between attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: MAX_RETRIES,
            delay: RETRY_DELAY,
        }
    }
}

/// How one record fared in one tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryOutcome {
    /// Submitted and removed from the store
    Succeeded {
        /// Hash reported by the bundler
        submitted: H256,
        /// Attempt that got through
        attempts: u32,
    },
    /// Window closed; record removed without submitting
    Expired,
    /// Window unusable for another reason; record left in place
    Skipped(WindowError),
    /// Every attempt failed, or an expired record could not be deleted;
    /// record left for the next tick
    Exhausted {
        /// Attempts made
        attempts: u32,
        /// Error from the final attempt
        last_error: String,
    },
}

impl RetryOutcome {
    /// Only a submission counts as success
    pub fn is_success(&self) -> bool {
        matches!(self, RetryOutcome::Succeeded { .. })
    }
}

impl fmt::Display for RetryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryOutcome::Succeeded { attempts, .. } => write!(f, "succeeded after {attempts} attempt(s)"),
            RetryOutcome::Expired => f.write_str("expired"),
            RetryOutcome::Skipped(reason) => write!(f, "skipped: {reason}"),
            RetryOutcome::Exhausted { attempts, .. } => write!(f, "exhausted after {attempts} attempt(s)"),
        }
    }
}

/// Drives one record through up to `max_retries` submission attempts,
/// re-checking its window before each one
///
/// Never returns an error: every failure is folded into [`RetryOutcome`]
/// and logged. The store is updated to match the outcome.
#[derive(Clone)]
pub struct RetryExecutor {
    store: Arc<dyn OperationStore>,
    client: Arc<dyn ExecutionClient>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl RetryExecutor {
    /// Create an executor
    pub fn new(
        store: Arc<dyn OperationStore>,
        client: Arc<dyn ExecutionClient>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            store,
            client,
            clock,
            policy,
        }
    }

    /// Retry limits in use
    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run the attempts for `record`
    pub async fn execute(&self, record: &ScheduledRecord) -> RetryOutcome {
        let hash = record.hash;
        let signature = record.userop.signature_hex();
        let max = self.policy.max_retries.max(1);
        let mut last_error = String::new();

        for attempt in 1..=max {
            match window::extract(&signature, self.clock.now()) {
                Err(WindowError::Expired { .. }) => {
                    return match self.delete_within_budget(&hash, attempt, max).await {
                        Ok(()) => {
                            info!(%hash, attempt, "operation expired, deleted");
                            RetryOutcome::Expired
                        }
                        Err(last_error) => {
                            warn!(%hash, "expired operation could not be deleted, kept for next tick");
                            RetryOutcome::Exhausted {
                                attempts: max,
                                last_error,
                            }
                        }
                    };
                }
                Err(reason) => {
                    info!(%hash, %reason, "skipping operation");
                    return RetryOutcome::Skipped(reason);
                }
                Ok(_) => {}
            }

            debug!(%hash, chain = %record.chain_id, attempt, "submitting operation");
            match self
                .client
                .submit(&record.userop, &record.entry_point, record.chain_id)
                .await
            {
                Ok(submitted) => {
                    self.remove_after_submit(&hash, attempt, max).await;
                    info!(%hash, %submitted, attempt, "operation executed");
                    return RetryOutcome::Succeeded {
                        submitted,
                        attempts: attempt,
                    };
                }
                Err(e) => {
                    error!(%hash, attempt, error = %e, "attempt failed");
                    last_error = e.to_string();
                    if attempt < max {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }

        warn!(%hash, attempts = max, "operation failed after all attempts, kept for next tick");
        RetryOutcome::Exhausted {
            attempts: max,
            last_error,
        }
    }

    /// Delete an executed record, retrying only the delete so the operation
    /// is never submitted twice
    async fn remove_after_submit(&self, hash: &H256, attempt: u32, max: u32) {
        if self.delete_within_budget(hash, attempt, max).await.is_err() {
            error!(%hash, "executed operation is still stored and may be resubmitted next tick");
        }
    }

    /// Delete `hash`, using the attempts left from `attempt` to `max`
    async fn delete_within_budget(&self, hash: &H256, attempt: u32, max: u32) -> Result<(), String> {
        let mut last_error = String::new();
        for delete_attempt in attempt..=max {
            match self.store.delete(hash).await {
                Ok(true) => return Ok(()),
                Ok(false) => {
                    debug!(%hash, "record already gone");
                    return Ok(());
                }
                Err(e) => {
                    error!(%hash, delete_attempt, error = %e, "failed to delete record");
                    last_error = e.to_string();
                    if delete_attempt < max {
                        tokio::time::sleep(self.policy.delay).await;
                    }
                }
            }
        }
        Err(last_error)
    }
}
