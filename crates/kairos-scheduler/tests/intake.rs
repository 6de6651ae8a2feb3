//! Execute-now-or-defer routing at intake

mod common;

use std::sync::Arc;

use common::{op_with_window, op_without_window, InstrumentedStore, NOW};
use kairos_bundler::{MockBundler, MockReply};
use kairos_metrics::{names, Metrics};
use kairos_primitives::{Address, U256};
use kairos_scheduler::{
    FixedClock, IntakeError, IntakeRequest, IntakeResponse, OperationIntake, WindowError,
};
use kairos_storage::{OperationStore, StorageError};
use kairos_types::{ChainId, EntryPoint, TypeError, UserOperation};

struct Fixture {
    store: Arc<InstrumentedStore>,
    bundler: Arc<MockBundler>,
    metrics: Arc<Metrics>,
    intake: OperationIntake,
}

fn fixture(bundler: MockBundler) -> Fixture {
    let store = Arc::new(InstrumentedStore::new());
    let bundler = Arc::new(bundler);
    let metrics = Arc::new(Metrics::new());
    let intake = OperationIntake::new(
        store.clone(),
        bundler.clone(),
        Arc::new(FixedClock::new(NOW)),
        metrics.clone(),
        [ChainId::Arbitrum, ChainId::Base],
    );
    Fixture {
        store,
        bundler,
        metrics,
        intake,
    }
}

fn request(userop: UserOperation, chain_id: ChainId) -> IntakeRequest {
    IntakeRequest {
        userop,
        entry_point: EntryPoint::V07,
        chain_id,
    }
}

#[tokio::test]
async fn test_no_window_executes_immediately() {
    let f = fixture(MockBundler::new());
    let op = op_without_window(1);
    let expected = op.hash(&EntryPoint::V07, ChainId::Base);

    let response = f.intake.submit(request(op, ChainId::Base)).await.unwrap();
    assert_eq!(response, IntakeResponse::Executed { hash: expected });
    assert_eq!(f.bundler.call_count(), 1);
    assert!(f.store.inner.is_empty());
    assert_eq!(f.metrics.get_counter(names::INTAKE_EXECUTED), Some(1));
}

#[tokio::test]
async fn test_open_window_executes_immediately() {
    let f = fixture(MockBundler::new());
    let op = op_with_window(2, NOW - 10, NOW + 3_600);

    let response = f.intake.submit(request(op, ChainId::Arbitrum)).await.unwrap();
    assert!(matches!(response, IntakeResponse::Executed { .. }));
    assert_eq!(f.bundler.call_count(), 1);
}

#[tokio::test]
async fn test_future_window_is_saved() {
    let f = fixture(MockBundler::new());
    let op = op_with_window(3, NOW + 600, NOW + 3_600);
    let expected = op.hash(&EntryPoint::V07, ChainId::Base);

    let response = f.intake.submit(request(op, ChainId::Base)).await.unwrap();
    assert_eq!(
        response,
        IntakeResponse::Deferred {
            message: "Saved".to_string(),
            hash: expected
        }
    );
    assert_eq!(f.bundler.call_count(), 0);
    assert_eq!(f.bundler.estimate_count(), 0);

    let stored = f.store.get(&expected).await.unwrap().unwrap();
    assert_eq!(stored.valid_after(), NOW + 600);
    assert_eq!(stored.valid_until(), NOW + 3_600);
    assert_eq!(f.metrics.get_counter(names::INTAKE_DEFERRED), Some(1));

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["message"], "Saved");
}

#[tokio::test]
async fn test_duplicate_deferral_is_rejected() {
    let f = fixture(MockBundler::new());
    let op = op_with_window(4, NOW + 600, NOW + 3_600);

    f.intake.submit(request(op.clone(), ChainId::Base)).await.unwrap();
    let err = f.intake.submit(request(op, ChainId::Base)).await.unwrap_err();
    assert!(matches!(
        err,
        IntakeError::Persistence(StorageError::AlreadyExists(_))
    ));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_preflight_estimate_runs_before_saving() {
    let mut f = fixture(MockBundler::new());
    f.intake = f.intake.with_preflight_estimate(true);
    let op = op_with_window(5, NOW + 600, NOW + 3_600);

    f.intake.submit(request(op, ChainId::Base)).await.unwrap();
    assert_eq!(f.bundler.estimate_count(), 1);
    assert_eq!(f.bundler.call_count(), 0);
    assert_eq!(f.store.inner.len(), 1);
}

#[tokio::test]
async fn test_rejections() {
    let f = fixture(MockBundler::new());

    let wrong_entry_point = IntakeRequest {
        entry_point: Address::from_bytes([0x5f; 20]),
        ..request(op_without_window(6), ChainId::Base)
    };
    let err = f.intake.submit(wrong_entry_point).await.unwrap_err();
    assert!(matches!(err, IntakeError::UnsupportedEntryPoint(_)));

    let err = f
        .intake
        .submit(request(op_without_window(7), ChainId::Mainnet))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::ChainNotPolled(ChainId::Mainnet)));

    let err = f
        .intake
        .submit(request(op_with_window(8, NOW - 600, NOW - 1), ChainId::Base))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::Window(WindowError::Expired { .. })));

    let mut oversized = op_without_window(9);
    oversized.call_gas_limit = U256::from(u128::MAX) + U256::one();
    let err = f
        .intake
        .submit(request(oversized, ChainId::Base))
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        IntakeError::InvalidOperation(TypeError::GasFieldTooLarge { .. })
    ));

    assert_eq!(f.bundler.call_count(), 0);
    assert_eq!(f.metrics.get_counter(names::INTAKE_REJECTED), Some(4));
}

#[tokio::test]
async fn test_bundler_failure_is_a_server_error() {
    let f = fixture(MockBundler::scripted([MockReply::Reject("AA21 didn't pay prefund".into())]));
    let err = f
        .intake
        .submit(request(op_without_window(10), ChainId::Arbitrum))
        .await
        .unwrap_err();
    assert!(matches!(err, IntakeError::Execution(_)));
    assert!(!err.is_client_error());
    assert_eq!(f.metrics.get_counter(names::INTAKE_REJECTED), None);
}

#[tokio::test]
async fn test_scheduled_lists_by_sender() {
    let f = fixture(MockBundler::new());
    f.intake
        .submit(request(op_with_window(11, NOW + 600, NOW + 3_600), ChainId::Base))
        .await
        .unwrap();
    f.intake
        .submit(request(op_with_window(12, NOW + 900, NOW + 3_600), ChainId::Arbitrum))
        .await
        .unwrap();

    let sender = Address::from_bytes([0x42; 20]);
    assert_eq!(f.intake.scheduled(&sender, None).await.unwrap().len(), 2);
    let on_base = f.intake.scheduled(&sender, Some(ChainId::Base)).await.unwrap();
    assert_eq!(on_base.len(), 1);
    assert!(f
        .intake
        .scheduled(&Address::ZERO, None)
        .await
        .unwrap()
        .is_empty());
}
