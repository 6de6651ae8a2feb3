//! HttpBundler against a local JSON-RPC stub

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;
use kairos_bundler::{BundlerError, ExecutionClient, HttpBundler, DUMMY_SIGNATURE};
use kairos_primitives::{Address, U256};
use kairos_types::{ChainId, EntryPoint, UserOperation};
use parking_lot::Mutex;
use serde_json::{json, Value};

type Seen = Arc<Mutex<Vec<Value>>>;

async fn rpc(State(seen): State<Seen>, Json(request): Json<Value>) -> Json<Value> {
    seen.lock().push(request.clone());
    let id = request["id"].clone();
    let reply = match request["method"].as_str() {
        Some("eth_sendUserOperation") => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b",
        }),
        Some("eth_estimateUserOperationGas") => json!({
            "jsonrpc": "2.0",
            "id": id,
            "result": {
                "preVerificationGas": "0xb708",
                "verificationGasLimit": "0x16c23",
                "callGasLimit": "0x2a3b",
            },
        }),
        _ => json!({
            "jsonrpc": "2.0",
            "id": id,
            "error": { "code": -32601, "message": "method not found" },
        }),
    };
    Json(reply)
}

async fn spawn_stub() -> (String, Seen) {
    let seen: Seen = Arc::default();
    let app = Router::new()
        .route("/", post(rpc))
        .with_state(Arc::clone(&seen));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{addr}/"), seen)
}

fn op() -> UserOperation {
    let mut signature = vec![0u8; 6];
    signature.extend_from_slice(&[0, 0, 0x65, 0x5a, 0x1f, 0x00]);
    signature.extend_from_slice(&[0x22; 65]);
    UserOperation {
        sender: Address::from_bytes([0x42; 20]),
        nonce: U256::from(3),
        factory: None,
        factory_data: None,
        call_data: Bytes::from_static(&[0xb6, 0x1d, 0x27, 0xf6]),
        call_gas_limit: U256::from(100_000),
        verification_gas_limit: U256::from(200_000),
        pre_verification_gas: U256::from(50_000),
        max_fee_per_gas: U256::from(2_000_000_000u64),
        max_priority_fee_per_gas: U256::from(1_000_000_000u64),
        paymaster: None,
        paymaster_verification_gas_limit: None,
        paymaster_post_op_gas_limit: None,
        paymaster_data: None,
        signature: Bytes::from(signature),
    }
}

#[tokio::test]
async fn test_submit_sends_user_operation() {
    let (url, seen) = spawn_stub().await;
    let bundler = HttpBundler::new(HashMap::from([(ChainId::Arbitrum, url)])).unwrap();

    let hash = bundler
        .submit(&op(), &EntryPoint::V07, ChainId::Arbitrum)
        .await
        .unwrap();
    assert_eq!(
        hash.to_hex(),
        "0x88df016429689c079f3b2f6ad39fa052532c56795b733da78a91ebe6a713944b"
    );

    let requests = seen.lock().clone();
    assert_eq!(requests.len(), 1);
    let params = &requests[0]["params"];
    assert_eq!(requests[0]["method"], "eth_sendUserOperation");
    assert_eq!(params[0]["nonce"], "0x3");
    assert_eq!(params[0]["callData"], "0xb61d27f6");
    assert!(params[0].get("paymaster").is_none());
    assert_eq!(
        params[1].as_str().unwrap().to_lowercase(),
        EntryPoint::V07.to_hex()
    );
}

#[tokio::test]
async fn test_estimate_uses_dummy_signature() {
    let (url, seen) = spawn_stub().await;
    let bundler = HttpBundler::new(HashMap::from([(ChainId::Base, url)])).unwrap();

    let estimate = bundler
        .estimate_gas(&op(), &EntryPoint::V07, ChainId::Base)
        .await
        .unwrap();
    assert_eq!(estimate.call_gas_limit, U256::from(0x2a3b));

    let requests = seen.lock().clone();
    let sent = requests[0]["params"][0]["signature"].as_str().unwrap().to_string();
    assert_eq!(sent, format!("0x{}", hex::encode(DUMMY_SIGNATURE)));
}

#[tokio::test]
async fn test_missing_endpoint_is_reported() {
    let bundler = HttpBundler::new(HashMap::new()).unwrap();
    let err = bundler
        .submit(&op(), &EntryPoint::V07, ChainId::Mainnet)
        .await
        .unwrap_err();
    assert!(matches!(err, BundlerError::NoEndpoint(ChainId::Mainnet)));
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transport_error() {
    let bundler = HttpBundler::new(HashMap::from([(
        ChainId::Base,
        "http://127.0.0.1:1/".to_string(),
    )]))
    .unwrap();
    let err = bundler
        .submit(&op(), &EntryPoint::V07, ChainId::Base)
        .await
        .unwrap_err();
    assert!(matches!(err, BundlerError::Transport(_)));
}

