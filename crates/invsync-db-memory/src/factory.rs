use std::sync::Arc;

use invsync_core::events::EventBroadcaster;
use invsync_storage::{DynStore, EventedStore};
use serde::{Deserialize, Serialize};

use crate::InMemoryStore;

/// Default upper bound on ids per match query.
pub const DEFAULT_MAX_QUERY_IDS: usize = 100;

/// Supported local store backend types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    /// In-memory store implemented on top of papaya::HashMap
    #[default]
    InMemory,
}

/// Store-specific configuration options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Largest id list a single match query accepts.
    #[serde(default = "default_max_query_ids")]
    pub max_query_ids: usize,
}

fn default_max_query_ids() -> usize {
    DEFAULT_MAX_QUERY_IDS
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            max_query_ids: DEFAULT_MAX_QUERY_IDS,
        }
    }
}

/// Factory configuration to construct a store instance.
#[derive(Debug, Clone, Default)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub options: StoreOptions,
}

/// Create a store instance based on the provided configuration.
pub fn create_store(config: &StoreConfig) -> DynStore {
    match config.backend {
        StoreBackend::InMemory => Arc::new(InMemoryStore::with_options(config.options.clone())),
    }
}

/// Like [`create_store`], but every successful mutation is published on `broadcaster`.
pub fn create_evented_store(config: &StoreConfig, broadcaster: Arc<EventBroadcaster>) -> DynStore {
    match config.backend {
        StoreBackend::InMemory => Arc::new(EventedStore::new(
            InMemoryStore::with_options(config.options.clone()),
            broadcaster,
        )),
    }
}
