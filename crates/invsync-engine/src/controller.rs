//! Cycle controller: drives one request through the stage graph.
//!
//! Every stage performs its I/O through the collaborators and reports a
//! [`StageEvent`]; [`transition`] picks the next stage. Before each pipeline
//! sub-stage the controller checks that its cycle still owns the key, which
//! is how a concurrent STOP takes effect.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use invsync_core::events::{CycleEvent, CycleOutcomeKind, EventBroadcaster};
use invsync_core::{RemoteResource, ResourceId, ResourceRef, ScopeRef};
use invsync_storage::{DynStore, LocalStore};
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::adapter::{MappingContext, ResourceAdapter};
use crate::adapters::AdapterRegistry;
use crate::clock::{Clock, SystemClock};
use crate::collaborators::{CredentialProvider, EnrichmentClient, RemoteListingClient};
use crate::config::EngineConfig;
use crate::cycle::Cycle;
use crate::differ::LocalDiffer;
use crate::enrichment::Enricher;
use crate::error::EngineError;
use crate::pager::RemotePager;
use crate::reconciler::{Reconciler, plan_removals, plan_upserts};
use crate::registry::InFlightRegistry;
use crate::report::{CycleOutcome, CycleReport};
use crate::request::{Action, EnumerationRequest};
use crate::stage::{Enumerating, PipelineStage, Stage, StageEvent, transition};

/// External capabilities the engine runs against.
#[derive(Clone)]
pub struct EngineCollaborators {
    pub store: DynStore,
    pub credentials: Arc<dyn CredentialProvider>,
    pub listing: Arc<dyn RemoteListingClient>,
    pub enrichment: Arc<dyn EnrichmentClient>,
}

enum Step {
    Event(StageEvent),
    AlreadyRunning,
}

pub struct EnumerationEngine {
    config: EngineConfig,
    collaborators: EngineCollaborators,
    adapters: AdapterRegistry,
    registry: Arc<InFlightRegistry>,
    clock: Arc<dyn Clock>,
    events: Option<Arc<EventBroadcaster>>,
}

impl EnumerationEngine {
    pub fn new(config: EngineConfig, collaborators: EngineCollaborators) -> Self {
        Self {
            config,
            collaborators,
            adapters: AdapterRegistry::with_defaults(),
            registry: Arc::new(InFlightRegistry::new()),
            clock: Arc::new(SystemClock),
            events: None,
        }
    }

    pub fn with_adapters(mut self, adapters: AdapterRegistry) -> Self {
        self.adapters = adapters;
        self
    }

    /// Shares an in-flight registry between engines.
    pub fn with_registry(mut self, registry: Arc<InFlightRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Publishes a [`CycleEvent`] on every terminal stage.
    pub fn with_events(mut self, events: Arc<EventBroadcaster>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<InFlightRegistry> {
        &self.registry
    }

    pub fn adapters(&self) -> &AdapterRegistry {
        &self.adapters
    }

    /// Handles one request to completion.
    ///
    /// Returns the report of a finished, stopped or already-running request,
    /// or the first fatal error of a cycle that ended in the error stage.
    pub async fn handle(&self, request: EnumerationRequest) -> Result<CycleReport, EngineError> {
        let span = info_span!("enumeration", key = %request.key(), action = %request.action);
        self.drive(request).instrument(span).await
    }

    /// Runs [`Self::handle`] on a new task.
    pub fn spawn(self: &Arc<Self>, request: EnumerationRequest) -> JoinHandle<Result<CycleReport, EngineError>> {
        let engine = Arc::clone(self);
        tokio::spawn(async move { engine.handle(request).await })
    }

    async fn drive(&self, request: EnumerationRequest) -> Result<CycleReport, EngineError> {
        let mut cycle = Cycle::new(request.key(), request.action.clone(), request.deletion_policy);

        let adapter = match request.action {
            Action::Stop => None,
            _ => match self.adapters.get(&request.adapter) {
                Ok(adapter) => Some(adapter),
                Err(e) => return Err(self.fail(cycle, e)),
            },
        };

        let mut stage = match Stage::initial(&request.action) {
            Ok(stage) => stage,
            Err(e) => return Err(self.fail(cycle, e)),
        };
        let mut stopped = false;

        loop {
            if stage.pipeline().is_some() && !self.owns_key(&cycle) {
                info!(stage = %stage, "Key no longer registered, stopping at stage boundary");
                stopped = true;
                stage = transition(stage, StageEvent::Stopped).unwrap_or(Stage::Finished);
            }

            match stage {
                Stage::Finished => return Ok(self.finish(cycle, stopped)),
                Stage::Error => {
                    let cause = cycle
                        .error
                        .take()
                        .unwrap_or_else(|| EngineError::unknown_stage("error stage without a cause"));
                    return Err(self.fail(cycle, cause));
                }
                _ => {}
            }

            let event = match self.step(stage, &mut cycle, adapter.as_deref()).await {
                Ok(Step::Event(event)) => event,
                Ok(Step::AlreadyRunning) => {
                    info!("Enumeration already running, nothing to do");
                    return Ok(CycleReport::already_running(cycle.key));
                }
                Err(e) => {
                    cycle.error = Some(e);
                    StageEvent::Failed
                }
            };
            if event == StageEvent::Stopped {
                stopped = true;
            }

            stage = match transition(stage, event) {
                Ok(next) => next,
                Err(e) => {
                    cycle.error = Some(e);
                    Stage::Error
                }
            };
        }
    }

    async fn step(
        &self,
        stage: Stage,
        cycle: &mut Cycle,
        adapter: Option<&dyn ResourceAdapter>,
    ) -> Result<Step, EngineError> {
        match stage {
            Stage::Authenticating => {
                let credentials = self
                    .collaborators
                    .credentials
                    .resolve(&cycle.key.scope)
                    .await
                    .map_err(|e| EngineError::auth(&cycle.key.scope, e))?;
                cycle.credentials = Some(credentials);
                Ok(Step::Event(StageEvent::Authenticated))
            }
            Stage::Enumerating(Enumerating::Start) => match self.registry.try_register(&cycle.key) {
                None => Ok(Step::AlreadyRunning),
                Some(token) => {
                    let start = self.clock.now();
                    cycle.token = Some(token);
                    cycle.start_timestamp = Some(start);
                    info!(start = %start, "Enumeration started");
                    Ok(Step::Event(StageEvent::Registered))
                }
            },
            Stage::Enumerating(Enumerating::Stop) => {
                let was_running = self.registry.stop(&cycle.key);
                info!(was_running, "Enumeration stop requested");
                Ok(Step::Event(StageEvent::Stopped))
            }
            Stage::Enumerating(Enumerating::Refresh(sub)) => {
                let adapter = adapter.ok_or_else(|| {
                    EngineError::unknown_stage(format!("{stage} reached without an adapter"))
                })?;
                let event = match sub {
                    PipelineStage::FetchPage => self.fetch_page(cycle, adapter).await?,
                    PipelineStage::ReconcilePage => self.reconcile_page(cycle, adapter).await?,
                    PipelineStage::Dependents => self.reconcile_dependents(cycle, adapter).await?,
                    PipelineStage::Enrich => self.enrich(cycle, adapter).await?,
                    PipelineStage::Sweep => self.sweep_page(cycle, adapter).await?,
                };
                Ok(Step::Event(event))
            }
            Stage::Finished | Stage::Error => Err(EngineError::unknown_stage(format!(
                "{stage} has no handler"
            ))),
        }
    }

    // ==================== Pipeline stages ====================

    async fn fetch_page(
        &self,
        cycle: &mut Cycle,
        adapter: &dyn ResourceAdapter,
    ) -> Result<StageEvent, EngineError> {
        let first = cycle.stats.pages == 0;
        let page = {
            let credentials = cycle
                .credentials
                .as_ref()
                .ok_or_else(|| EngineError::unknown_stage("listing before authentication"))?;
            let pager = RemotePager::new(
                self.collaborators.listing.as_ref(),
                credentials,
                &cycle.key.scope,
                adapter.kind(),
            );
            pager.fetch_page(cycle.page_cursor.as_ref()).await?
        };

        let empty = page.is_empty();
        let has_more = page.has_more();
        cycle.page_cursor = page.next_cursor;
        for id in cycle.record_page(page.resources)? {
            warn!(id = %id, "Resource listed on more than one page, keeping the latest");
        }

        if first && empty && !has_more {
            info!("Provider reports no resources, skipping to the sweep");
        }
        Ok(StageEvent::PageFetched {
            first,
            empty,
            has_more,
        })
    }

    async fn reconcile_page(
        &self,
        cycle: &mut Cycle,
        adapter: &dyn ResourceAdapter,
    ) -> Result<StageEvent, EngineError> {
        let store: &dyn LocalStore = self.collaborators.store.as_ref();
        let start = cycle_start(cycle)?;
        let scope = cycle.key.scope.clone();

        let plan = {
            let remotes = cycle.current_resources();
            let differ = LocalDiffer::new(store, &self.config);
            let ids: Vec<ResourceId> = remotes.iter().map(|remote| remote.id.clone()).collect();
            let existing = differ.match_existing(&scope, adapter.kind(), &ids).await?;
            let present = self.required_present(&differ, &scope, adapter, &remotes).await?;
            let ctx = MappingContext::new(&scope, start, &present);
            plan_upserts(adapter, &remotes, &existing, &ctx)
        };

        for (id, reason) in &plan.skipped {
            warn!(id = %id, reason = %reason, "Skipping resource until a later cycle");
        }

        let summary = Reconciler::new(store)
            .execute("upsert", plan.operations())
            .await;
        cycle.stats.record_batch(&summary);
        cycle.stats.unchanged += plan.unchanged.len();
        cycle.stats.skipped += plan.skipped.len();

        for snapshot in plan.creates.into_iter().chain(plan.updates) {
            if summary.succeeded_ref(&snapshot.reference()) {
                cycle.reconciled.insert(snapshot.id.clone(), snapshot);
            }
        }
        for snapshot in plan.unchanged {
            cycle.reconciled.insert(snapshot.id.clone(), snapshot);
        }

        Ok(StageEvent::PageReconciled {
            more_pages: cycle.page_cursor.is_some(),
        })
    }

    async fn reconcile_dependents(
        &self,
        cycle: &mut Cycle,
        adapter: &dyn ResourceAdapter,
    ) -> Result<StageEvent, EngineError> {
        let Some(dependent_adapter) = adapter.dependent_adapter() else {
            return Ok(StageEvent::DependentsDone);
        };

        let mut dependents: BTreeMap<ResourceId, RemoteResource> = BTreeMap::new();
        for remote in cycle.remote_resources() {
            for dependent in adapter.dependents(remote) {
                if dependent.kind == dependent_adapter.kind() {
                    dependents.insert(dependent.id.clone(), dependent);
                }
            }
        }
        if dependents.is_empty() {
            return Ok(StageEvent::DependentsDone);
        }

        let store = self.collaborators.store.as_ref();
        let start = cycle_start(cycle)?;
        let scope = cycle.key.scope.clone();

        let plan = {
            let remotes: Vec<&RemoteResource> = dependents.values().collect();
            let ids: Vec<ResourceId> = dependents.keys().cloned().collect();
            let differ = LocalDiffer::new(store, &self.config);
            let existing = differ
                .match_existing(&scope, dependent_adapter.kind(), &ids)
                .await?;
            let present = self
                .required_present(&differ, &scope, dependent_adapter, &remotes)
                .await?;
            let ctx = MappingContext::new(&scope, start, &present);
            plan_upserts(dependent_adapter, &remotes, &existing, &ctx)
        };

        debug!(
            kind = %dependent_adapter.kind(),
            creates = plan.creates.len(),
            updates = plan.updates.len(),
            unchanged = plan.unchanged.len(),
            "Dependent resources planned"
        );

        let summary = Reconciler::new(store)
            .execute("dependents", plan.operations())
            .await;
        cycle.stats.record_batch(&summary);
        cycle.stats.skipped += plan.skipped.len();
        Ok(StageEvent::DependentsDone)
    }

    async fn enrich(
        &self,
        cycle: &mut Cycle,
        adapter: &dyn ResourceAdapter,
    ) -> Result<StageEvent, EngineError> {
        let resources: Vec<_> = std::mem::take(&mut cycle.reconciled).into_values().collect();
        if resources.is_empty() {
            return Ok(StageEvent::EnrichmentDone);
        }

        let start = cycle_start(cycle)?;
        let credentials = cycle
            .credentials
            .as_ref()
            .ok_or_else(|| EngineError::unknown_stage("enrichment before authentication"))?;
        let enricher = Enricher {
            store: self.collaborators.store.as_ref(),
            client: self.collaborators.enrichment.as_ref(),
            adapter,
            credentials,
            scope: &cycle.key.scope,
            cycle_start: start,
            concurrency: self.config.enrichment_concurrency,
        };
        let summary = enricher.run(resources).await;

        info!(
            patched = summary.patched,
            unchanged = summary.unchanged,
            lookup_failures = summary.lookup_failures,
            patch_failures = summary.patch_failures,
            "Enrichment completed"
        );
        cycle.stats.enriched += summary.patched;
        cycle.stats.enrichment_failures += summary.lookup_failures;
        cycle.stats.failed_operations += summary.patch_failures;
        Ok(StageEvent::EnrichmentDone)
    }

    async fn sweep_page(
        &self,
        cycle: &mut Cycle,
        adapter: &dyn ResourceAdapter,
    ) -> Result<StageEvent, EngineError> {
        cycle.seal();
        let store = self.collaborators.store.as_ref();
        let start = cycle_start(cycle)?;
        let cursor = cycle.sweep_cursor.take();

        let page = {
            let differ = LocalDiffer::new(store, &self.config);
            differ
                .sweep_page(&cycle.key.scope, adapter.kind(), start, cursor, |id| {
                    cycle.seen_remotely(id)
                })
                .await?
        };

        let operations = plan_removals(&page.candidates, cycle.policy, start);
        let summary = Reconciler::new(store).execute("sweep", operations).await;
        cycle.stats.record_batch(&summary);
        cycle.sweep_cursor = page.next_cursor;

        Ok(StageEvent::SweepPageDone {
            more_pages: cycle.sweep_cursor.is_some(),
        })
    }

    /// Required references of `remotes` that exist locally.
    async fn required_present(
        &self,
        differ: &LocalDiffer<'_>,
        scope: &ScopeRef,
        adapter: &dyn ResourceAdapter,
        remotes: &[&RemoteResource],
    ) -> Result<HashSet<ResourceRef>, EngineError> {
        let required: Vec<ResourceRef> = remotes
            .iter()
            .filter_map(|remote| adapter.required_links(remote).ok())
            .flatten()
            .map(|(_, target)| target)
            .collect();
        if required.is_empty() {
            return Ok(HashSet::new());
        }
        differ.existing_refs(scope, required).await
    }

    // ==================== Terminal stages ====================

    fn owns_key(&self, cycle: &Cycle) -> bool {
        cycle
            .token
            .as_ref()
            .is_some_and(|token| self.registry.is_active(&cycle.key, token))
    }

    fn release(&self, cycle: &Cycle) {
        if let Some(token) = &cycle.token {
            self.registry.unregister(&cycle.key, token);
        }
    }

    fn finish(&self, cycle: Cycle, stopped: bool) -> CycleReport {
        self.release(&cycle);
        let (outcome, event) = if stopped {
            (CycleOutcome::Stopped, CycleOutcomeKind::Stopped)
        } else {
            (CycleOutcome::Finished, CycleOutcomeKind::Finished)
        };

        let stats = &cycle.stats;
        info!(
            outcome = ?outcome,
            pages = stats.pages,
            remote = stats.remote_seen,
            created = stats.created,
            updated = stats.updated,
            unchanged = stats.unchanged,
            skipped = stats.skipped,
            deleted = stats.deleted,
            retired = stats.retired,
            failed = stats.failed_operations,
            "Enumeration finished"
        );
        self.emit(CycleEvent::new(cycle.key.clone(), event));

        CycleReport {
            key: cycle.key,
            outcome,
            started_at: cycle.start_timestamp,
            stats: cycle.stats,
        }
    }

    fn fail(&self, cycle: Cycle, cause: EngineError) -> EngineError {
        self.release(&cycle);
        error!(
            error = %cause,
            category = ?cause.storage_category(),
            "Enumeration failed"
        );
        self.emit(CycleEvent::new(
            cycle.key,
            CycleOutcomeKind::Failed(cause.to_string()),
        ));
        cause
    }

    fn emit(&self, event: CycleEvent) {
        if let Some(events) = &self.events {
            events.send_cycle(event);
        }
    }
}

fn cycle_start(cycle: &Cycle) -> Result<time::OffsetDateTime, EngineError> {
    cycle
        .start_timestamp
        .ok_or_else(|| EngineError::unknown_stage("pipeline stage before registration"))
}

impl std::fmt::Debug for EnumerationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnumerationEngine")
            .field("config", &self.config)
            .field("adapters", &self.adapters)
            .field("in_flight", &self.registry.len())
            .field("store", &self.collaborators.store.backend_name())
            .finish()
    }
}
