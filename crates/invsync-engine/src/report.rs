use invsync_core::EnumerationKey;
use invsync_storage::OperationKind;
use serde::Serialize;
use time::OffsetDateTime;

use crate::reconciler::BatchSummary;

/// How a successfully handled request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// The pipeline ran to completion.
    Finished,
    /// Another cycle already holds the key; nothing was done.
    AlreadyRunning,
    /// A STOP request was handled, or the cycle observed one at a stage boundary.
    Stopped,
}

/// Counters accumulated over one cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleStats {
    pub pages: usize,
    pub remote_seen: usize,
    pub duplicates: usize,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub deleted: usize,
    pub retired: usize,
    pub failed_operations: usize,
    pub enriched: usize,
    pub enrichment_failures: usize,
}

impl CycleStats {
    /// Folds an executed batch into the counters.
    pub fn record_batch(&mut self, summary: &BatchSummary) {
        self.created += summary.count(OperationKind::Create);
        self.updated += summary.count(OperationKind::Update);
        self.deleted += summary.count(OperationKind::Delete);
        self.retired += summary.count(OperationKind::Retire);
        self.failed_operations += summary.failures.len();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub key: EnumerationKey,
    pub outcome: CycleOutcome,
    #[serde(with = "time::serde::rfc3339::option")]
    pub started_at: Option<OffsetDateTime>,
    pub stats: CycleStats,
}

impl CycleReport {
    pub fn already_running(key: EnumerationKey) -> Self {
        Self {
            key,
            outcome: CycleOutcome::AlreadyRunning,
            started_at: None,
            stats: CycleStats::default(),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome == CycleOutcome::Finished
    }
}
