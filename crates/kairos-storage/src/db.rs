//! RocksDB-backed operation store

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use kairos_primitives::{Address, Timestamp, H256};
use kairos_types::{ChainId, ScheduledRecord};
use parking_lot::Mutex;
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};
use tracing::debug;

use crate::error::{StorageError, StorageResult};
use crate::traits::{due_cutoff, OperationStore};

/// Column family names
pub mod cf {
    /// Operation hash -> JSON record
    pub const OPERATIONS: &str = "operations";
    /// chain ‖ valid_after ‖ hash -> empty
    pub const DUE_INDEX: &str = "due_index";
    /// sender ‖ hash -> chain
    pub const SENDER_INDEX: &str = "sender_index";
}

/// All column family names
pub const ALL_CFS: &[&str] = &[cf::OPERATIONS, cf::DUE_INDEX, cf::SENDER_INDEX];

type RocksDB = DBWithThreadMode<MultiThreaded>;

/// Database configuration
#[derive(Clone, Debug)]
pub struct DbConfig {
    /// Create database if missing
    pub create_if_missing: bool,
    /// Maximum number of open files
    pub max_open_files: i32,
    /// Write buffer size
    pub write_buffer_size: usize,
    /// Maximum write buffers
    pub max_write_buffer_number: i32,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            create_if_missing: true,
            max_open_files: 256,
            write_buffer_size: 16 * 1024 * 1024, // 16MB
            max_write_buffer_number: 2,
        }
    }
}

struct Inner {
    db: RocksDB,
    // serialises check-then-write sequences (save, delete)
    write_lock: Mutex<()>,
    path: String,
}

/// Operation store persisted in RocksDB
///
/// Cloning is cheap; clones share the same database handle.
#[derive(Clone)]
pub struct RocksStore {
    inner: Arc<Inner>,
}

impl RocksStore {
    /// Open (or create) a store at `path` with default config
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        Self::open_with_config(path, DbConfig::default())
    }

    /// Open (or create) a store at `path` with custom config
    pub fn open_with_config(path: impl AsRef<Path>, config: DbConfig) -> StorageResult<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(config.create_if_missing);
        opts.create_missing_column_families(true);
        opts.set_max_open_files(config.max_open_files);
        opts.set_write_buffer_size(config.write_buffer_size);
        opts.set_max_write_buffer_number(config.max_write_buffer_number);

        let cf_descriptors: Vec<ColumnFamilyDescriptor> = ALL_CFS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Options::default()))
            .collect();

        let path = path.as_ref().to_string_lossy().to_string();
        let db = RocksDB::open_cf_descriptors(&opts, &path, cf_descriptors)?;
        debug!(path = %path, "opened operation store");

        Ok(Self {
            inner: Arc::new(Inner {
                db,
                write_lock: Mutex::new(()),
                path,
            }),
        })
    }

    /// Get database path
    pub fn path(&self) -> &str {
        &self.inner.path
    }

    /// Run a blocking closure against the database off the async runtime
    async fn blocking<T, F>(&self, f: F) -> StorageResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Inner) -> StorageResult<T> + Send + 'static,
    {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || f(&inner))
            .await
            .map_err(|e| StorageError::Task(e.to_string()))?
    }
}

impl Inner {
    fn cf(&self, name: &str) -> StorageResult<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::InvalidColumnFamily(name.to_string()))
    }

    fn read_record(&self, hash: &H256) -> StorageResult<Option<ScheduledRecord>> {
        let ops = self.cf(cf::OPERATIONS)?;
        match self.db.get_cf(&ops, hash.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save(&self, record: &ScheduledRecord) -> StorageResult<H256> {
        let value = serde_json::to_vec(record)?;
        let ops = self.cf(cf::OPERATIONS)?;
        let due = self.cf(cf::DUE_INDEX)?;
        let senders = self.cf(cf::SENDER_INDEX)?;

        let _guard = self.write_lock.lock();
        if self.db.get_cf(&ops, record.hash.as_bytes())?.is_some() {
            return Err(StorageError::AlreadyExists(record.hash));
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(&ops, record.hash.as_bytes(), &value);
        batch.put_cf(&due, due_key(record.chain_id, record.valid_after(), &record.hash), b"");
        batch.put_cf(
            &senders,
            sender_key(&record.sender(), &record.hash),
            record.chain_id.id().to_be_bytes(),
        );
        self.db.write(batch)?;
        Ok(record.hash)
    }

    fn delete(&self, hash: &H256) -> StorageResult<bool> {
        let ops = self.cf(cf::OPERATIONS)?;
        let due = self.cf(cf::DUE_INDEX)?;
        let senders = self.cf(cf::SENDER_INDEX)?;

        let _guard = self.write_lock.lock();
        let Some(record) = self.read_record(hash)? else {
            return Ok(false);
        };

        let mut batch = WriteBatch::default();
        batch.delete_cf(&ops, hash.as_bytes());
        batch.delete_cf(&due, due_key(record.chain_id, record.valid_after(), hash));
        batch.delete_cf(&senders, sender_key(&record.sender(), hash));
        self.db.write(batch)?;
        Ok(true)
    }

    fn list_due(&self, chain: ChainId, cutoff: Timestamp) -> StorageResult<Vec<ScheduledRecord>> {
        let due = self.cf(cf::DUE_INDEX)?;
        let start = due_key(chain, 0, &H256::ZERO);
        let mut records = Vec::new();

        for item in self
            .db
            .iterator_cf(&due, IteratorMode::From(&start, Direction::Forward))
        {
            let (key, _) = item?;
            let (key_chain, valid_after, hash) = split_due_key(&key)?;
            if key_chain != chain.id() || valid_after > cutoff {
                break;
            }
            match self.read_record(&hash)? {
                Some(record) => records.push(record),
                None => {
                    return Err(StorageError::InvalidFormat(format!(
                        "due index points at missing record {hash}"
                    )))
                }
            }
        }
        Ok(records)
    }

    fn list_by_sender(
        &self,
        sender: &Address,
        chain: Option<ChainId>,
    ) -> StorageResult<Vec<ScheduledRecord>> {
        let senders = self.cf(cf::SENDER_INDEX)?;
        let prefix = sender.as_bytes();
        let mut records = Vec::new();

        for item in self
            .db
            .iterator_cf(&senders, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            if let Some(wanted) = chain {
                if decode_u64(&value)? != wanted.id() {
                    continue;
                }
            }
            let hash = H256::from_slice(&key[Address::LEN..])
                .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
            if let Some(record) = self.read_record(&hash)? {
                records.push(record);
            }
        }
        records.sort_by_key(|r| (r.valid_after(), r.hash));
        Ok(records)
    }

    fn chains_in_use(&self) -> StorageResult<BTreeSet<ChainId>> {
        let due = self.cf(cf::DUE_INDEX)?;
        let mut chains = BTreeSet::new();
        let mut seek: Vec<u8> = Vec::new();

        // Jump from one chain prefix to the next instead of scanning every record
        loop {
            let first = self
                .db
                .iterator_cf(&due, IteratorMode::From(&seek, Direction::Forward))
                .next();
            let Some(item) = first else {
                break;
            };
            let (key, _) = item?;
            let (chain_id, _, _) = split_due_key(&key)?;
            let chain = ChainId::try_from(chain_id)
                .map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
            chains.insert(chain);
            match chain_id.checked_add(1) {
                Some(next) => seek = next.to_be_bytes().to_vec(),
                None => break,
            }
        }
        Ok(chains)
    }
}

#[async_trait]
impl OperationStore for RocksStore {
    async fn save(&self, record: &ScheduledRecord) -> StorageResult<H256> {
        let record = record.clone();
        self.blocking(move |inner| inner.save(&record)).await
    }

    async fn list_due(
        &self,
        chain: ChainId,
        now: Timestamp,
        lookahead: Duration,
    ) -> StorageResult<Vec<ScheduledRecord>> {
        let cutoff = due_cutoff(now, lookahead);
        self.blocking(move |inner| inner.list_due(chain, cutoff)).await
    }

    async fn delete(&self, hash: &H256) -> StorageResult<bool> {
        let hash = *hash;
        self.blocking(move |inner| inner.delete(&hash)).await
    }

    async fn list_by_sender(
        &self,
        sender: &Address,
        chain: Option<ChainId>,
    ) -> StorageResult<Vec<ScheduledRecord>> {
        let sender = *sender;
        self.blocking(move |inner| inner.list_by_sender(&sender, chain))
            .await
    }

    async fn get(&self, hash: &H256) -> StorageResult<Option<ScheduledRecord>> {
        let hash = *hash;
        self.blocking(move |inner| inner.read_record(&hash)).await
    }

    async fn chains_in_use(&self) -> StorageResult<BTreeSet<ChainId>> {
        self.blocking(|inner| inner.chains_in_use()).await
    }
}

const DUE_KEY_LEN: usize = 8 + 8 + H256::LEN;

fn due_key(chain: ChainId, valid_after: Timestamp, hash: &H256) -> [u8; DUE_KEY_LEN] {
    let mut key = [0u8; DUE_KEY_LEN];
    key[..8].copy_from_slice(&chain.id().to_be_bytes());
    key[8..16].copy_from_slice(&valid_after.to_be_bytes());
    key[16..].copy_from_slice(hash.as_bytes());
    key
}

fn split_due_key(key: &[u8]) -> StorageResult<(u64, Timestamp, H256)> {
    if key.len() != DUE_KEY_LEN {
        return Err(StorageError::InvalidFormat(format!(
            "due index key has length {}",
            key.len()
        )));
    }
    let hash =
        H256::from_slice(&key[16..]).map_err(|e| StorageError::InvalidFormat(e.to_string()))?;
    Ok((decode_u64(&key[..8])?, decode_u64(&key[8..16])?, hash))
}

fn sender_key(sender: &Address, hash: &H256) -> Vec<u8> {
    let mut key = Vec::with_capacity(Address::LEN + H256::LEN);
    key.extend_from_slice(sender.as_bytes());
    key.extend_from_slice(hash.as_bytes());
    key
}

fn decode_u64(bytes: &[u8]) -> StorageResult<u64> {
    let raw: [u8; 8] = bytes
        .try_into()
        .map_err(|_| StorageError::InvalidFormat(format!("expected 8 bytes, got {}", bytes.len())))?;
    Ok(u64::from_be_bytes(raw))
}
