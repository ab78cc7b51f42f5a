use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use invsync_core::ScopeRef;
use serde::{Deserialize, Serialize};
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, warn};

use crate::controller::EnumerationEngine;
use crate::error::EngineError;
use crate::report::{CycleOutcome, CycleReport};
use crate::request::{DeletionPolicy, EnumerationRequest};

/// One (scope, adapter) pair refreshed on every tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleTarget {
    pub scope: ScopeRef,
    pub adapter: String,
    /// Overrides the engine's default deletion policy for this target.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deletion_policy: Option<DeletionPolicy>,
}

impl ScheduleTarget {
    pub fn new(scope: ScopeRef, adapter: impl Into<String>) -> Self {
        Self {
            scope,
            adapter: adapter.into(),
            deletion_policy: None,
        }
    }
}

/// Periodic REFRESH trigger for a fixed set of targets.
///
/// A tick that finds a key still running gets an already-running report for
/// it; the running cycle is not disturbed.
pub struct EnumerationScheduler {
    engine: Arc<EnumerationEngine>,
    targets: Vec<ScheduleTarget>,
}

impl EnumerationScheduler {
    pub fn new(engine: Arc<EnumerationEngine>, targets: Vec<ScheduleTarget>) -> Self {
        Self { engine, targets }
    }

    pub fn targets(&self) -> &[ScheduleTarget] {
        &self.targets
    }

    pub fn requests(&self) -> Vec<EnumerationRequest> {
        let default_policy = self.engine.config().deletion_policy_default;
        self.targets
            .iter()
            .map(|target| {
                EnumerationRequest::start(target.scope.clone(), target.adapter.clone())
                    .with_policy(target.deletion_policy.unwrap_or(default_policy))
            })
            .collect()
    }

    /// Runs one refresh for every target and waits for all of them.
    pub async fn tick(&self) -> Vec<Result<CycleReport, EngineError>> {
        join_all(self.requests().into_iter().map(|request| self.engine.handle(request))).await
    }

    /// Starts a refresh for every target every `period` until `shutdown`
    /// resolves. Cycles are spawned, so a slow target never delays the next
    /// tick for the others.
    pub async fn run(&self, period: Duration, shutdown: impl Future<Output = ()>) {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        info!(
            targets = self.targets.len(),
            period_secs = period.as_secs(),
            "Enumeration scheduler started"
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Enumeration scheduler stopping");
                    break;
                }
                _ = ticker.tick() => self.dispatch(),
            }
        }
    }

    fn dispatch(&self) {
        for request in self.requests() {
            let engine = Arc::clone(&self.engine);
            tokio::spawn(async move {
                let key = request.key();
                log_result(&key.to_string(), engine.handle(request).await);
            });
        }
    }
}

/// Logs how a scheduled cycle ended.
pub fn log_result(key: &str, result: Result<CycleReport, EngineError>) {
    match result {
        Ok(report) if report.outcome == CycleOutcome::AlreadyRunning => {
            warn!(key, "Previous cycle still running, tick skipped");
        }
        Ok(report) => {
            if report.stats.failed_operations > 0 {
                warn!(
                    key,
                    failed = report.stats.failed_operations,
                    "Cycle finished with failed operations"
                );
            }
        }
        Err(e) => {
            error!(key, error = %e, "Scheduled cycle failed");
        }
    }
}
