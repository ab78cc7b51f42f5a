use serde::{Deserialize, Serialize};

use crate::request::DeletionPolicy;

/// Tuning knobs of the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Ids per local match query. Clamped by the store's own limit.
    #[serde(default = "default_match_batch_size")]
    pub match_batch_size: usize,
    /// Records per staleness sweep page.
    #[serde(default = "default_sweep_page_size")]
    pub sweep_page_size: usize,
    /// Resources enriched concurrently.
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,
    /// Policy used by the scheduler for the requests it issues.
    #[serde(default)]
    pub deletion_policy_default: DeletionPolicy,
}

fn default_match_batch_size() -> usize {
    50
}

fn default_sweep_page_size() -> usize {
    50
}

fn default_enrichment_concurrency() -> usize {
    8
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            match_batch_size: default_match_batch_size(),
            sweep_page_size: default_sweep_page_size(),
            enrichment_concurrency: default_enrichment_concurrency(),
            deletion_policy_default: DeletionPolicy::default(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.match_batch_size == 0 {
            return Err("engine.match_batch_size must be > 0".into());
        }
        if self.sweep_page_size == 0 {
            return Err("engine.sweep_page_size must be > 0".into());
        }
        if self.enrichment_concurrency == 0 {
            return Err("engine.enrichment_concurrency must be > 0".into());
        }
        Ok(())
    }

    /// Chunk size actually used for match queries against a store.
    pub fn match_chunk_size(&self, store_limit: usize) -> usize {
        self.match_batch_size.min(store_limit).max(1)
    }
}
