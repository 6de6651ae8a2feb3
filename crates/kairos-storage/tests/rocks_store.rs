//! RocksDB store behaviour against a real database directory

use std::time::Duration;

use bytes::Bytes;
use kairos_primitives::{Address, U256};
use kairos_storage::{OperationStore, RocksStore, StorageError};
use kairos_types::{ChainId, EntryPoint, ScheduledRecord, UserOperation, ValidityWindow};
use tempfile::TempDir;

fn record(sender: u8, nonce: u64, chain: ChainId, after: u64) -> ScheduledRecord {
    let op = UserOperation {
        sender: Address::from_bytes([sender; 20]),
        nonce: U256::from(nonce) | (U256::from(9) << 64),
        factory: None,
        factory_data: None,
        call_data: Bytes::from_static(&[0xb6, 0x1d, 0x27, 0xf6]),
        call_gas_limit: U256::from(150_000),
        verification_gas_limit: U256::from(300_000),
        pre_verification_gas: U256::from(48_000),
        // wider than a double can represent exactly
        max_fee_per_gas: U256::from(u64::MAX) * U256::from(1_000_003u64),
        max_priority_fee_per_gas: U256::from(1_500_000_000u64),
        paymaster: None,
        paymaster_verification_gas_limit: None,
        paymaster_post_op_gas_limit: None,
        paymaster_data: None,
        signature: Bytes::from(vec![0x11; 65]),
    };
    let window = ValidityWindow::new(after, after + 7_200).unwrap();
    ScheduledRecord::new(op, EntryPoint::V07, chain, window)
}

#[tokio::test]
async fn test_save_and_reopen_round_trips_exactly() {
    let dir = TempDir::new().unwrap();
    let r = record(1, 0, ChainId::Base, 1_700_000_000);
    {
        let store = RocksStore::open(dir.path()).unwrap();
        store.save(&r).await.unwrap();
    }

    let store = RocksStore::open(dir.path()).unwrap();
    let loaded = store.get(&r.hash).await.unwrap().unwrap();
    assert_eq!(loaded, r);
    assert_eq!(loaded.userop.max_fee_per_gas, r.userop.max_fee_per_gas);
}

#[tokio::test]
async fn test_duplicate_save_fails() {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    let r = record(1, 0, ChainId::Base, 100);

    store.save(&r).await.unwrap();
    match store.save(&r).await {
        Err(StorageError::AlreadyExists(hash)) => assert_eq!(hash, r.hash),
        other => panic!("expected AlreadyExists, got {other:?}"),
    }
}

#[tokio::test]
async fn test_list_due_uses_lookahead_and_order() {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    let now = 10_000;

    let in_lookahead = record(1, 0, ChainId::Arbitrum, now + 1_800);
    let past = record(1, 1, ChainId::Arbitrum, now - 60);
    let beyond = record(1, 2, ChainId::Arbitrum, now + 1_801);
    let other_chain = record(1, 3, ChainId::Mainnet, now - 60);
    for r in [&in_lookahead, &past, &beyond, &other_chain] {
        store.save(r).await.unwrap();
    }

    let due = store
        .list_due(ChainId::Arbitrum, now, Duration::from_secs(1_800))
        .await
        .unwrap();
    let hashes: Vec<_> = due.iter().map(|r| r.hash).collect();
    assert_eq!(hashes, vec![past.hash, in_lookahead.hash]);

    let mainnet = store
        .list_due(ChainId::Mainnet, now, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(mainnet.len(), 1);
    assert!(store
        .list_due(ChainId::Base, now, Duration::from_secs(1_800))
        .await
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn test_delete_removes_from_every_index() {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    let r = record(4, 0, ChainId::Base, 500);
    store.save(&r).await.unwrap();

    assert!(store.delete(&r.hash).await.unwrap());
    assert!(!store.delete(&r.hash).await.unwrap());
    assert!(store.get(&r.hash).await.unwrap().is_none());
    assert!(store
        .list_due(ChainId::Base, 500, Duration::ZERO)
        .await
        .unwrap()
        .is_empty());
    assert!(store
        .list_by_sender(&r.sender(), None)
        .await
        .unwrap()
        .is_empty());
    assert!(store.chains_in_use().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_list_by_sender_filters_chain() {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    store.save(&record(5, 0, ChainId::Base, 300)).await.unwrap();
    store.save(&record(5, 1, ChainId::Mainnet, 200)).await.unwrap();
    store.save(&record(6, 0, ChainId::Base, 100)).await.unwrap();

    let sender = Address::from_bytes([5; 20]);
    let all = store.list_by_sender(&sender, None).await.unwrap();
    assert_eq!(
        all.iter().map(|r| r.valid_after()).collect::<Vec<_>>(),
        vec![200, 300]
    );

    let base = store
        .list_by_sender(&sender, Some(ChainId::Base))
        .await
        .unwrap();
    assert_eq!(base.len(), 1);
    assert_eq!(base[0].chain_id, ChainId::Base);
}

#[tokio::test]
async fn test_chains_in_use() {
    let dir = TempDir::new().unwrap();
    let store = RocksStore::open(dir.path()).unwrap();
    assert!(store.chains_in_use().await.unwrap().is_empty());

    store.save(&record(1, 0, ChainId::Arbitrum, 1)).await.unwrap();
    store.save(&record(1, 1, ChainId::Arbitrum, 2)).await.unwrap();
    store.save(&record(1, 2, ChainId::Mainnet, 3)).await.unwrap();

    let chains: Vec<_> = store.chains_in_use().await.unwrap().into_iter().collect();
    assert_eq!(chains, vec![ChainId::Mainnet, ChainId::Arbitrum]);
}
