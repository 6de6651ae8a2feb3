//! JSON-RPC bundler client over HTTP

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use kairos_primitives::{Address, H256};
use kairos_types::{ChainId, UserOperation};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::client::{with_dummy_signature, ExecutionClient, GasEstimate};
use crate::error::{BundlerError, BundlerResult};

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Bundler client speaking the ERC-4337 JSON-RPC methods
///
/// Each chain is served by its own endpoint URL.
pub struct HttpBundler {
    client: reqwest::Client,
    endpoints: HashMap<ChainId, String>,
    request_id: AtomicU64,
}

impl HttpBundler {
    /// Create a client with the default timeout
    pub fn new(endpoints: HashMap<ChainId, String>) -> BundlerResult<Self> {
        Self::with_timeout(endpoints, DEFAULT_TIMEOUT)
    }

    /// Create a client with a custom per-request timeout
    pub fn with_timeout(
        endpoints: HashMap<ChainId, String>,
        timeout: Duration,
    ) -> BundlerResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoints,
            request_id: AtomicU64::new(1),
        })
    }

    /// Chains with a configured endpoint
    pub fn chains(&self) -> impl Iterator<Item = ChainId> + '_ {
        self.endpoints.keys().copied()
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    async fn request<T: DeserializeOwned>(
        &self,
        chain: ChainId,
        method: &str,
        params: Vec<Value>,
    ) -> BundlerResult<T> {
        let url = self
            .endpoints
            .get(&chain)
            .ok_or(BundlerError::NoEndpoint(chain))?;
        let id = self.next_id();
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!(%chain, method, id, "bundler request");

        let response: JsonRpcResponse = self
            .client
            .post(url)
            .json(&request)
            .send()
            .await?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(BundlerError::Rpc {
                code: error.code,
                message: error.message,
            });
        }
        let result = response
            .result
            .ok_or_else(|| BundlerError::InvalidResponse("no result in response".to_string()))?;
        Ok(serde_json::from_value(result)?)
    }
}

#[async_trait]
impl ExecutionClient for HttpBundler {
    async fn submit(
        &self,
        op: &UserOperation,
        entry_point: &Address,
        chain: ChainId,
    ) -> BundlerResult<H256> {
        let params = vec![serde_json::to_value(op)?, json!(entry_point)];
        let hash: String = self.request(chain, "eth_sendUserOperation", params).await?;
        H256::from_hex(&hash).map_err(|e| BundlerError::InvalidResponse(e.to_string()))
    }

    async fn estimate_gas(
        &self,
        op: &UserOperation,
        entry_point: &Address,
        chain: ChainId,
    ) -> BundlerResult<GasEstimate> {
        let op = with_dummy_signature(op);
        let params = vec![serde_json::to_value(&op)?, json!(entry_point)];
        self.request(chain, "eth_estimateUserOperationGas", params)
            .await
    }
}

#[derive(Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
    error: Option<JsonRpcError>,
}

#[derive(Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}
