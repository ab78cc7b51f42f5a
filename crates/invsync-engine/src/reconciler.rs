//! Create/update/delete decisions and their batched execution.

use std::collections::{BTreeSet, HashMap};

use invsync_core::{RemoteResource, ResourceId, ResourceRef, ResourceSnapshot};
use invsync_storage::{BatchOperation, BatchOutcome, LocalStore, OperationKind};
use time::OffsetDateTime;
use tracing::{info, warn};

use crate::adapter::{Mapping, MappingContext, ResourceAdapter};
use crate::error::EngineError;
use crate::request::DeletionPolicy;

/// Decisions for one set of remote resources.
#[derive(Debug, Default)]
pub struct ReconcilePlan {
    pub creates: Vec<ResourceSnapshot>,
    pub updates: Vec<ResourceSnapshot>,
    /// Local records that already match the provider.
    pub unchanged: Vec<ResourceSnapshot>,
    pub skipped: Vec<(ResourceId, String)>,
}

impl ReconcilePlan {
    pub fn operations(&self) -> Vec<BatchOperation> {
        self.creates
            .iter()
            .cloned()
            .map(BatchOperation::Create)
            .chain(self.updates.iter().cloned().map(BatchOperation::Update))
            .collect()
    }
}

/// Whether `next` differs from the stored record in anything but the timestamp.
pub fn needs_update(current: &ResourceSnapshot, next: &ResourceSnapshot) -> bool {
    if current.last_updated_at == next.last_updated_at {
        return current != next;
    }
    let mut aligned = next.clone();
    aligned.last_updated_at = current.last_updated_at;
    current != &aligned
}

/// Plans creates for unmatched resources and updates for matched ones.
///
/// Matched resources whose mapped snapshot equals the stored one are left
/// unchanged. Updated and created snapshots carry the cycle timestamp.
pub fn plan_upserts(
    adapter: &dyn ResourceAdapter,
    remotes: &[&RemoteResource],
    existing: &HashMap<ResourceId, ResourceSnapshot>,
    ctx: &MappingContext<'_>,
) -> ReconcilePlan {
    let mut plan = ReconcilePlan::default();

    for remote in remotes {
        let mapping = match existing.get(&remote.id) {
            None => adapter.build_snapshot(remote, ctx),
            Some(current) => adapter.apply_update(current, remote, ctx),
        };

        match (existing.get(&remote.id), mapping) {
            (_, Mapping::Skip(reason)) => plan.skipped.push((remote.id.clone(), reason)),
            (None, Mapping::Mapped(snapshot)) => plan.creates.push(snapshot),
            (Some(current), Mapping::Mapped(mut next)) => {
                if needs_update(current, &next) {
                    next.last_updated_at = ctx.cycle_start;
                    plan.updates.push(next);
                } else {
                    plan.unchanged.push(current.clone());
                }
            }
        }
    }

    plan
}

/// Operations removing stale records under `policy`.
///
/// Hard deletes cascade to attached dependents; retiring leaves them alone
/// and stamps the retired record with `cycle_start`.
pub fn plan_removals(
    candidates: &[ResourceSnapshot],
    policy: DeletionPolicy,
    cycle_start: OffsetDateTime,
) -> Vec<BatchOperation> {
    match policy {
        DeletionPolicy::Retire => candidates
            .iter()
            .map(|candidate| BatchOperation::Retire(candidate.reference(), cycle_start))
            .collect(),
        DeletionPolicy::Delete => {
            let mut targets = BTreeSet::new();
            let mut operations = Vec::new();
            for candidate in candidates {
                let parent = candidate.reference();
                for target in std::iter::once(parent).chain(candidate.attached.iter().cloned()) {
                    if targets.insert(target.clone()) {
                        operations.push(BatchOperation::Delete(target));
                    }
                }
            }
            operations
        }
    }
}

/// Per-operation results of one executed batch.
#[derive(Debug, Default)]
pub struct BatchSummary {
    pub succeeded: Vec<(OperationKind, ResourceRef)>,
    pub failures: Vec<EngineError>,
}

impl BatchSummary {
    pub fn from_outcome(outcome: BatchOutcome) -> Self {
        let mut summary = Self::default();
        for result in outcome.results {
            match result.result {
                Ok(()) => summary.succeeded.push((result.kind, result.target)),
                Err(e) => summary
                    .failures
                    .push(EngineError::batch_operation(result.kind, result.target, e)),
            }
        }
        summary
    }

    pub fn count(&self, kind: OperationKind) -> usize {
        self.succeeded.iter().filter(|(k, _)| *k == kind).count()
    }

    pub fn succeeded_ref(&self, target: &ResourceRef) -> bool {
        self.succeeded.iter().any(|(_, succeeded)| succeeded == target)
    }
}

/// Issues batches against the local store and logs per-operation failures.
pub struct Reconciler<'a> {
    store: &'a dyn LocalStore,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a dyn LocalStore) -> Self {
        Self { store }
    }

    /// Runs `operations` as one batch. Individual failures are logged and
    /// returned in the summary; they never fail the call.
    pub async fn execute(&self, phase: &'static str, operations: Vec<BatchOperation>) -> BatchSummary {
        if operations.is_empty() {
            return BatchSummary::default();
        }

        let issued = operations.len();
        let summary = BatchSummary::from_outcome(self.store.execute_batch(operations).await);

        for failure in &summary.failures {
            warn!(
                phase,
                category = ?failure.storage_category(),
                error = %failure,
                "Batch operation failed"
            );
        }

        info!(
            phase,
            issued,
            created = summary.count(OperationKind::Create),
            updated = summary.count(OperationKind::Update),
            deleted = summary.count(OperationKind::Delete),
            retired = summary.count(OperationKind::Retire),
            failed = summary.failures.len(),
            "Batch completed"
        );

        summary
    }
}
