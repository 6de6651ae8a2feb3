//! Accepting new operations: execute now or defer

use std::collections::BTreeSet;
use std::sync::Arc;

use kairos_bundler::ExecutionClient;
use kairos_metrics::{names, Metrics};
use kairos_primitives::{Address, H256};
use kairos_storage::OperationStore;
use kairos_types::{ChainId, EntryPoint, ScheduledRecord, UserOperation};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{IntakeError, IntakeResult};
use crate::window;

/// An operation submitted for execution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRequest {
    /// The operation
    pub userop: UserOperation,
    /// Entry point it targets
    pub entry_point: Address,
    /// Target chain
    pub chain_id: ChainId,
}

/// What happened to an accepted operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IntakeResponse {
    /// Deferred until its window opens
    Deferred {
        /// Always "Saved"
        message: String,
        /// Operation hash the record is stored under
        hash: H256,
    },
    /// Submitted immediately
    Executed {
        /// Hash reported by the bundler
        hash: H256,
    },
}

impl IntakeResponse {
    /// Hash carried by either variant
    pub fn hash(&self) -> H256 {
        match self {
            IntakeResponse::Deferred { hash, .. } | IntakeResponse::Executed { hash } => *hash,
        }
    }
}

/// Validates incoming operations and routes them by validity window
pub struct OperationIntake {
    store: Arc<dyn OperationStore>,
    client: Arc<dyn ExecutionClient>,
    clock: Arc<dyn Clock>,
    metrics: Arc<Metrics>,
    chains: BTreeSet<ChainId>,
    preflight_estimate: bool,
}

impl OperationIntake {
    /// Create an intake serving `chains`
    pub fn new(
        store: Arc<dyn OperationStore>,
        client: Arc<dyn ExecutionClient>,
        clock: Arc<dyn Clock>,
        metrics: Arc<Metrics>,
        chains: impl IntoIterator<Item = ChainId>,
    ) -> Self {
        Self {
            store,
            client,
            clock,
            metrics,
            chains: chains.into_iter().collect(),
            preflight_estimate: false,
        }
    }

    /// Run a gas estimate before deferring an operation
    pub fn with_preflight_estimate(mut self, enabled: bool) -> Self {
        self.preflight_estimate = enabled;
        self
    }

    /// Chains this intake accepts
    pub fn chains(&self) -> &BTreeSet<ChainId> {
        &self.chains
    }

    /// Execute `request` now if its window allows, otherwise store it
    pub async fn submit(&self, request: IntakeRequest) -> IntakeResult<IntakeResponse> {
        let result = self.route(request).await;
        match &result {
            Ok(IntakeResponse::Executed { .. }) => self.metrics.incr(names::INTAKE_EXECUTED),
            Ok(IntakeResponse::Deferred { .. }) => self.metrics.incr(names::INTAKE_DEFERRED),
            Err(e) if e.is_client_error() => self.metrics.incr(names::INTAKE_REJECTED),
            Err(_) => {}
        }
        result
    }

    async fn route(&self, request: IntakeRequest) -> IntakeResult<IntakeResponse> {
        let IntakeRequest {
            userop,
            entry_point,
            chain_id,
        } = request;

        if !EntryPoint::is_supported(&entry_point) {
            return Err(IntakeError::UnsupportedEntryPoint(entry_point));
        }
        if !self.chains.contains(&chain_id) {
            return Err(IntakeError::ChainNotPolled(chain_id));
        }
        userop.validate()?;

        let now = self.clock.now();
        let window = window::extract(&userop.signature_hex(), now)?;

        match window {
            Some(w) if !w.contains(now) => {
                let record = ScheduledRecord::new(userop, entry_point, chain_id, w);
                if self.preflight_estimate {
                    self.preflight(&record).await;
                }
                let hash = self.store.save(&record).await?;
                info!(
                    %hash,
                    chain = %chain_id,
                    valid_after = w.valid_after,
                    valid_until = w.valid_until,
                    "operation deferred"
                );
                Ok(IntakeResponse::Deferred {
                    message: "Saved".to_string(),
                    hash,
                })
            }
            _ => {
                let hash = self.client.submit(&userop, &entry_point, chain_id).await?;
                info!(%hash, chain = %chain_id, "operation executed immediately");
                Ok(IntakeResponse::Executed { hash })
            }
        }
    }

    async fn preflight(&self, record: &ScheduledRecord) {
        match self
            .client
            .estimate_gas(&record.userop, &record.entry_point, record.chain_id)
            .await
        {
            Ok(estimate) => info!(hash = %record.hash, ?estimate, "pre-flight gas estimate"),
            Err(e) => warn!(hash = %record.hash, error = %e, "pre-flight gas estimate failed"),
        }
    }

    /// Deferred operations submitted by `sender`
    pub async fn scheduled(
        &self,
        sender: &Address,
        chain: Option<ChainId>,
    ) -> IntakeResult<Vec<ScheduledRecord>> {
        Ok(self.store.list_by_sender(sender, chain).await?)
    }
}
