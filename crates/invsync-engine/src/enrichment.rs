//! Second-round provider lookups for reconciled resources.
//!
//! Each resource runs its lookups concurrently and is patched once all of
//! them have completed, whatever their individual results. Resources are
//! processed with bounded concurrency and never affect each other.

use futures_util::future::join_all;
use futures_util::stream::{self, StreamExt};
use invsync_core::{ResourceId, ResourceRef, ResourceSnapshot, ScopeRef};
use invsync_storage::LocalStore;
use time::OffsetDateTime;
use tracing::{debug, warn};

use crate::adapter::{EnrichmentStep, ResourceAdapter};
use crate::collaborators::{Credentials, EnrichmentClient};
use crate::error::EngineError;

/// Totals of one enrichment pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentSummary {
    /// Resources whose patch was written.
    pub patched: usize,
    /// Resources whose lookups changed nothing (or that had no lookups).
    pub unchanged: usize,
    pub lookup_failures: usize,
    pub patch_failures: usize,
}

#[derive(Debug, Default)]
struct ResourceOutcome {
    patched: bool,
    lookup_failures: usize,
    patch_failed: bool,
}

pub struct Enricher<'a> {
    pub store: &'a dyn LocalStore,
    pub client: &'a dyn EnrichmentClient,
    pub adapter: &'a dyn ResourceAdapter,
    pub credentials: &'a Credentials,
    pub scope: &'a ScopeRef,
    pub cycle_start: OffsetDateTime,
    pub concurrency: usize,
}

impl Enricher<'_> {
    pub async fn run(&self, resources: Vec<ResourceSnapshot>) -> EnrichmentSummary {
        let outcomes: Vec<ResourceOutcome> = stream::iter(resources)
            .map(|snapshot| self.enrich_one(snapshot))
            .buffer_unordered(self.concurrency.max(1))
            .collect()
            .await;

        outcomes
            .into_iter()
            .fold(EnrichmentSummary::default(), |mut summary, outcome| {
                if outcome.patched {
                    summary.patched += 1;
                } else if !outcome.patch_failed {
                    summary.unchanged += 1;
                }
                summary.lookup_failures += outcome.lookup_failures;
                summary.patch_failures += usize::from(outcome.patch_failed);
                summary
            })
    }

    async fn enrich_one(&self, snapshot: ResourceSnapshot) -> ResourceOutcome {
        let plan = self.adapter.enrichment_plan(&snapshot);
        if plan.is_empty() {
            return ResourceOutcome::default();
        }

        let target = snapshot.reference();
        let results = join_all(plan.iter().map(|step| self.run_step(&target, step))).await;

        let mut outcome = ResourceOutcome::default();
        let mut patched = snapshot.clone();
        for (step, result) in plan.iter().zip(results) {
            match result {
                Ok(value) => self.adapter.apply_enrichment(&mut patched, step.lookup(), &value),
                Err(e) => {
                    outcome.lookup_failures += 1;
                    warn!(error = %e, "Enrichment lookup failed, field left unset");
                }
            }
        }

        if patched == snapshot {
            debug!(target = %target, "Enrichment changed nothing");
            return outcome;
        }

        patched.last_updated_at = self.cycle_start;
        match self.store.update(patched).await {
            Ok(_) => outcome.patched = true,
            Err(e) => {
                outcome.patch_failed = true;
                warn!(target = %target, error = %e, "Enrichment patch failed");
            }
        }
        outcome
    }

    async fn run_step(&self, target: &ResourceRef, step: &EnrichmentStep) -> Result<String, EngineError> {
        let lookup = step.lookup();
        let failed = |reason: String| EngineError::enrichment(lookup.as_str(), target.clone(), reason);

        let lookup_id = match step {
            EnrichmentStep::Direct { target: id, .. } => id.clone(),
            EnrichmentStep::Chained { via, property, .. } => {
                let intermediate = self
                    .store
                    .read(via)
                    .await
                    .map_err(|e| failed(e.to_string()))?
                    .ok_or_else(|| failed(format!("{via} not found locally")))?;
                let raw = intermediate
                    .provider_property(property)
                    .ok_or_else(|| failed(format!("{via} has no {property}")))?;
                ResourceId::new(raw).map_err(|e| failed(e.to_string()))?
            }
        };

        self.client
            .lookup(self.credentials, self.scope, lookup, &lookup_id)
            .await
            .map_err(|e| failed(e.to_string()))
    }
}
