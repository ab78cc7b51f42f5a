use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use invsync_core::events::{EventBroadcaster, SystemEvent};
use invsync_db_memory::create_evented_store;
use invsync_engine::{
    CycleReport, EngineCollaborators, EngineError, EnumerationEngine, EnumerationScheduler,
};
use invsync_storage::DynStore;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::fixture::FixtureProvider;

/// Engine, store and scheduler wired from an [`AppConfig`].
pub struct InventoryApp {
    config: AppConfig,
    engine: Arc<EnumerationEngine>,
    store: DynStore,
    events: Arc<EventBroadcaster>,
    scheduler: EnumerationScheduler,
}

impl InventoryApp {
    /// Loads the fixture named by `fixture.path` and builds the app on it.
    pub async fn from_config(config: AppConfig) -> anyhow::Result<Self> {
        let provider = match &config.fixture.path {
            Some(path) => FixtureProvider::load(path)
                .with_context(|| format!("loading fixture {path}"))?,
            None => {
                warn!("No fixture configured, every scope will fail authentication");
                FixtureProvider::default()
            }
        };
        Self::with_provider(config, Arc::new(provider)).await
    }

    pub async fn with_provider(config: AppConfig, provider: Arc<FixtureProvider>) -> anyhow::Result<Self> {
        let events = EventBroadcaster::new_shared();
        let store = create_evented_store(&config.store.to_store_config(), events.clone());

        for snapshot in provider.seed_snapshots() {
            store
                .create(snapshot.clone())
                .await
                .with_context(|| format!("seeding {}", snapshot.reference()))?;
        }
        info!(
            backend = store.backend_name(),
            seeded = provider.seed_snapshots().len(),
            "Local store ready"
        );

        let engine = Arc::new(
            EnumerationEngine::new(
                config.engine.clone(),
                EngineCollaborators {
                    store: store.clone(),
                    credentials: provider.clone(),
                    listing: provider.clone(),
                    enrichment: provider,
                },
            )
            .with_events(events.clone()),
        );
        let scheduler = EnumerationScheduler::new(engine.clone(), config.scheduler.targets.clone());

        Ok(Self {
            config,
            engine,
            store,
            events,
            scheduler,
        })
    }

    pub fn engine(&self) -> &Arc<EnumerationEngine> {
        &self.engine
    }

    pub fn store(&self) -> &DynStore {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventBroadcaster> {
        &self.events
    }

    /// Runs every configured target once.
    pub async fn run_once(&self) -> Vec<Result<CycleReport, EngineError>> {
        self.scheduler.tick().await
    }

    /// Runs the scheduler until `shutdown` resolves.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        let logger = self.spawn_event_logger();
        self.scheduler.run(self.config.interval(), shutdown).await;
        logger.abort();
    }

    fn spawn_event_logger(&self) -> JoinHandle<()> {
        let mut receiver = self.events.subscribe();
        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(SystemEvent::Inventory(event)) => debug!(
                        event = %event.event_type,
                        kind = %event.kind,
                        id = %event.resource_id,
                        "Inventory changed"
                    ),
                    Ok(SystemEvent::Cycle(event)) => info!(
                        key = %event.key,
                        outcome = ?event.outcome,
                        "Cycle ended"
                    ),
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Event logger lagging, events dropped");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }
}
