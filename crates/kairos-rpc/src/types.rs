//! Request parsing for the HTTP routes

use std::str::FromStr;

use kairos_primitives::Address;
use kairos_scheduler::IntakeRequest;
use kairos_types::{ChainId, ScheduledRecord, UserOperation};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Parse a `POST /userop` body
///
/// `userop` may be an object or a JSON-encoded string of one; `chainId`
/// may be a number or a numeric/named string.
pub fn parse_userop_request(body: &[u8]) -> Result<IntakeRequest, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::validation(format!("invalid JSON body: {e}")))?;
    let Value::Object(mut fields) = value else {
        return Err(ApiError::validation("request body must be a JSON object"));
    };

    let userop = match fields.remove("userop") {
        Some(Value::String(encoded)) => serde_json::from_str::<UserOperation>(&encoded),
        Some(object) => serde_json::from_value::<UserOperation>(object),
        None => return Err(ApiError::validation("missing field: userop")),
    }
    .map_err(|e| ApiError::validation(format!("userop: {e}")))?;

    let entry_point = match fields.remove("entryPoint") {
        Some(Value::String(s)) => Address::from_hex(&s)
            .map_err(|e| ApiError::validation(format!("entryPoint: {e}")))?,
        Some(_) => return Err(ApiError::validation("entryPoint: expected a hex string")),
        None => return Err(ApiError::validation("missing field: entryPoint")),
    };

    let chain_id = match fields.remove("chainId") {
        Some(value) => parse_chain(&value)?,
        None => return Err(ApiError::validation("missing field: chainId")),
    };

    Ok(IntakeRequest {
        userop,
        entry_point,
        chain_id,
    })
}

fn parse_chain(value: &Value) -> Result<ChainId, ApiError> {
    let parsed = match value {
        Value::Number(n) => {
            let id = n.as_u64().ok_or_else(|| {
                ApiError::validation(format!("chainId: {n} is not an unsigned integer"))
            })?;
            ChainId::try_from(id)
        }
        Value::String(s) => ChainId::from_str(s),
        _ => return Err(ApiError::validation("chainId: expected a number")),
    };
    parsed.map_err(|e| ApiError::validation(format!("chainId: {e}")))
}

/// Query string of `GET /scheduled`
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledQuery {
    /// Sender address, any case
    pub sender: Option<String>,
    /// Optional chain filter
    pub chain_id: Option<String>,
}

impl ScheduledQuery {
    /// Validate into a sender and optional chain
    pub fn parse(&self) -> Result<(Address, Option<ChainId>), ApiError> {
        let sender = self
            .sender
            .as_deref()
            .ok_or_else(|| ApiError::validation("missing query parameter: sender"))?;
        let sender =
            Address::from_hex(sender).map_err(|e| ApiError::validation(format!("sender: {e}")))?;
        let chain = self
            .chain_id
            .as_deref()
            .map(|c| ChainId::from_str(c).map_err(|e| ApiError::validation(format!("chainId: {e}"))))
            .transpose()?;
        Ok((sender, chain))
    }
}

/// Body of `GET /scheduled`
#[derive(Debug, Clone, Serialize)]
pub struct ScheduledOps {
    /// Deferred operations of the sender
    pub ops: Vec<ScheduledRecord>,
}
