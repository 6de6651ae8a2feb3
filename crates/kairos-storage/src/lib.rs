//! # kairos-storage
//!
//! Persistence for deferred user operations.
//!
//! This crate provides:
//! - The [`OperationStore`] contract used by intake and the scheduler
//! - [`MemoryStore`], a concurrent in-memory backend
//! - [`RocksStore`], a RocksDB backend with secondary indexes

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod db;
mod error;
mod memory;
mod traits;

pub use db::{DbConfig, RocksStore};
pub use error::{StorageError, StorageResult};
pub use memory::MemoryStore;
pub use traits::OperationStore;
