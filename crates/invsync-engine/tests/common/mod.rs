//! Collaborator doubles shared by the engine integration tests.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use invsync_core::{
    RemoteResource, ResourceId, ResourceKind, ResourceRef, ResourceSnapshot, ScopeRef,
};
use invsync_db_memory::{InMemoryStore, StoreOptions};
use invsync_engine::{
    CredentialProvider, Credentials, EngineCollaborators, EngineConfig, EnrichmentClient,
    EnumerationEngine, LookupKind, ManualClock, ProviderError, RemoteCursor, RemoteListingClient,
    RemotePage,
};
use invsync_storage::{LocalStore, StaleQuery, StalePage, StorageError};
use time::{Duration, OffsetDateTime};
use tokio::sync::Semaphore;

pub const ADAPTER_VMS: &str = "virtual-machines";
pub const ADAPTER_DISKS: &str = "disks";

pub fn scope() -> ScopeRef {
    ScopeRef::new("tenant-a", "sub-1").unwrap()
}

pub fn id(raw: &str) -> ResourceId {
    ResourceId::new(raw).unwrap()
}

pub fn t0() -> OffsetDateTime {
    OffsetDateTime::UNIX_EPOCH + Duration::days(1)
}

pub fn t1() -> OffsetDateTime {
    t0() + Duration::hours(1)
}

pub fn remote(kind: ResourceKind, raw_id: &str) -> RemoteResource {
    RemoteResource::new(id(raw_id), kind, raw_id)
}

pub fn local(kind: ResourceKind, raw_id: &str, at: OffsetDateTime) -> ResourceSnapshot {
    ResourceSnapshot::new(id(raw_id), kind, scope(), raw_id, at)
}

pub fn reference(kind: ResourceKind, raw_id: &str) -> ResourceRef {
    ResourceRef::new(kind, id(raw_id))
}

// ============================================================================
// Credentials
// ============================================================================

#[derive(Default)]
pub struct StaticCredentials {
    pub calls: AtomicUsize,
    pub fail: bool,
}

impl StaticCredentials {
    pub fn failing() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail: true,
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticCredentials {
    async fn resolve(&self, scope: &ScopeRef) -> Result<Credentials, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::unauthorized(format!("no credentials for {scope}")));
        }
        Ok(Credentials::new("svc-reader", "s3cret"))
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Serves pre-scripted pages per kind. Cursors are page indexes.
#[derive(Default)]
pub struct ScriptedListing {
    pages: Mutex<HashMap<ResourceKind, Vec<Vec<RemoteResource>>>>,
    failure: Mutex<Option<ProviderError>>,
    gate: Option<Arc<Semaphore>>,
    pub calls: AtomicUsize,
}

impl ScriptedListing {
    /// Every call waits for one permit on `gate`.
    pub fn gated(gate: Arc<Semaphore>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::default()
        }
    }

    pub fn set_pages(&self, kind: ResourceKind, pages: Vec<Vec<RemoteResource>>) {
        self.pages.lock().unwrap().insert(kind, pages);
    }

    pub fn fail_with(&self, error: ProviderError) {
        *self.failure.lock().unwrap() = Some(error);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteListingClient for ScriptedListing {
    async fn list(
        &self,
        _credentials: &Credentials,
        _scope: &ScopeRef,
        kind: ResourceKind,
        cursor: Option<&RemoteCursor>,
    ) -> Result<RemotePage, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(error) = self.failure.lock().unwrap().clone() {
            return Err(error);
        }

        let index = match cursor {
            Some(cursor) => cursor
                .as_str()
                .parse::<usize>()
                .map_err(|_| ProviderError::invalid_response("bad cursor"))?,
            None => 0,
        };
        let pages = self.pages.lock().unwrap();
        let Some(kind_pages) = pages.get(&kind) else {
            return Ok(RemotePage::default());
        };
        let items = kind_pages.get(index).cloned().unwrap_or_default();
        let next_cursor = if index + 1 < kind_pages.len() {
            RemoteCursor::new((index + 1).to_string())
        } else {
            None
        };
        Ok(RemotePage::new(items, next_cursor))
    }
}

// ============================================================================
// Enrichment
// ============================================================================

/// Answers lookups from a table; anything missing is `NotFound`.
#[derive(Default)]
pub struct TableEnrichment {
    answers: Mutex<HashMap<(LookupKind, String), Result<String, ProviderError>>>,
    pub calls: AtomicUsize,
}

impl TableEnrichment {
    pub fn answer(&self, kind: LookupKind, target: &str, value: &str) {
        self.answers
            .lock()
            .unwrap()
            .insert((kind, id(target).into_inner()), Ok(value.to_string()));
    }

    pub fn fail(&self, kind: LookupKind, target: &str, error: ProviderError) {
        self.answers
            .lock()
            .unwrap()
            .insert((kind, id(target).into_inner()), Err(error));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EnrichmentClient for TableEnrichment {
    async fn lookup(
        &self,
        _credentials: &Credentials,
        _scope: &ScopeRef,
        kind: LookupKind,
        target: &ResourceId,
    ) -> Result<String, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answers
            .lock()
            .unwrap()
            .get(&(kind, target.as_str().to_string()))
            .cloned()
            .unwrap_or_else(|| Err(ProviderError::not_found(target.to_string())))
    }
}

// ============================================================================
// Store
// ============================================================================

/// In-memory store with failure injection and query accounting.
pub struct InstrumentedStore {
    pub inner: InMemoryStore,
    pub fail_match: bool,
    pub fail_sweep: bool,
    pub fail_create: HashSet<ResourceId>,
    pub match_queries: AtomicUsize,
    pub largest_match: AtomicUsize,
}

impl InstrumentedStore {
    pub fn new(inner: InMemoryStore) -> Self {
        Self {
            inner,
            fail_match: false,
            fail_sweep: false,
            fail_create: HashSet::new(),
            match_queries: AtomicUsize::new(0),
            largest_match: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl LocalStore for InstrumentedStore {
    async fn read(&self, target: &ResourceRef) -> Result<Option<ResourceSnapshot>, StorageError> {
        self.inner.read(target).await
    }

    async fn query_by_ids(
        &self,
        scope: &ScopeRef,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> Result<Vec<ResourceSnapshot>, StorageError> {
        self.match_queries.fetch_add(1, Ordering::SeqCst);
        self.largest_match.fetch_max(ids.len(), Ordering::SeqCst);
        if self.fail_match {
            return Err(StorageError::connection_error("match query refused"));
        }
        self.inner.query_by_ids(scope, kind, ids).await
    }

    async fn query_stale(&self, query: &StaleQuery) -> Result<StalePage, StorageError> {
        if self.fail_sweep {
            return Err(StorageError::connection_error("sweep query refused"));
        }
        self.inner.query_stale(query).await
    }

    async fn create(&self, snapshot: ResourceSnapshot) -> Result<ResourceSnapshot, StorageError> {
        if self.fail_create.contains(&snapshot.id) {
            return Err(StorageError::internal(format!("create of {} refused", snapshot.id)));
        }
        self.inner.create(snapshot).await
    }

    async fn update(&self, snapshot: ResourceSnapshot) -> Result<ResourceSnapshot, StorageError> {
        self.inner.update(snapshot).await
    }

    async fn delete(&self, target: &ResourceRef) -> Result<(), StorageError> {
        self.inner.delete(target).await
    }

    async fn retire(&self, target: &ResourceRef, at: OffsetDateTime) -> Result<(), StorageError> {
        self.inner.retire(target, at).await
    }

    fn max_query_ids(&self) -> usize {
        self.inner.max_query_ids()
    }

    fn backend_name(&self) -> &'static str {
        "instrumented"
    }
}

// ============================================================================
// Harness
// ============================================================================

pub struct Harness {
    pub engine: Arc<EnumerationEngine>,
    pub store: Arc<InstrumentedStore>,
    pub credentials: Arc<StaticCredentials>,
    pub listing: Arc<ScriptedListing>,
    pub enrichment: Arc<TableEnrichment>,
    pub clock: Arc<ManualClock>,
}

pub struct HarnessBuilder {
    config: EngineConfig,
    store: InstrumentedStore,
    credentials: StaticCredentials,
    listing: ScriptedListing,
}

impl HarnessBuilder {
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            store: InstrumentedStore::new(InMemoryStore::new()),
            credentials: StaticCredentials::default(),
            listing: ScriptedListing::default(),
        }
    }

    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn store_limit(mut self, max_query_ids: usize) -> Self {
        self.store.inner = InMemoryStore::with_options(StoreOptions { max_query_ids });
        self
    }

    pub fn store(mut self, configure: impl FnOnce(&mut InstrumentedStore)) -> Self {
        configure(&mut self.store);
        self
    }

    pub fn credentials(mut self, credentials: StaticCredentials) -> Self {
        self.credentials = credentials;
        self
    }

    pub fn listing(mut self, listing: ScriptedListing) -> Self {
        self.listing = listing;
        self
    }

    pub fn build(self) -> Harness {
        let store = Arc::new(self.store);
        let credentials = Arc::new(self.credentials);
        let listing = Arc::new(self.listing);
        let enrichment = Arc::new(TableEnrichment::default());
        let clock = Arc::new(ManualClock::new(t1()));

        let engine = EnumerationEngine::new(
            self.config,
            EngineCollaborators {
                store: store.clone(),
                credentials: credentials.clone(),
                listing: listing.clone(),
                enrichment: enrichment.clone(),
            },
        )
        .with_clock(clock.clone());

        Harness {
            engine: Arc::new(engine),
            store,
            credentials,
            listing,
            enrichment,
            clock,
        }
    }
}

impl Harness {
    pub fn seed(&self, snapshot: ResourceSnapshot) {
        self.store.inner.seed(snapshot);
    }

    pub fn record(&self, kind: ResourceKind, raw_id: &str) -> Option<ResourceSnapshot> {
        self.store
            .inner
            .records_of(kind)
            .into_iter()
            .find(|record| record.id == id(raw_id))
    }

    pub fn ids_of(&self, kind: ResourceKind) -> Vec<String> {
        self.store
            .inner
            .records_of(kind)
            .into_iter()
            .map(|record| record.id.into_inner())
            .collect()
    }
}
