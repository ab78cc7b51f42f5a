//! In-memory local inventory store for invsync.
//!
//! This crate provides an in-memory implementation of the `LocalStore` trait
//! from `invsync-storage`, using papaya lock-free HashMap for concurrent access.
//!
//! # Example
//!
//! ```ignore
//! use invsync_db_memory::InMemoryStore;
//! use invsync_storage::LocalStore;
//!
//! let store = InMemoryStore::new();
//! store.create(snapshot).await?;
//! let found = store.query_by_ids(&scope, ResourceKind::Disk, &ids).await?;
//! ```

pub mod factory;
pub mod storage;
mod store_impl;

pub use invsync_storage::{LocalStore, StorageError};

pub use factory::{
    DEFAULT_MAX_QUERY_IDS, StoreBackend, StoreConfig, StoreOptions, create_evented_store,
    create_store,
};
pub use storage::{InMemoryStore, StorageKey, StoreStats, StoreStatsSnapshot};
