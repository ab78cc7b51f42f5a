//! EventedStore - a store wrapper that publishes inventory events after mutations.
//!
//! # Example
//!
//! ```ignore
//! use invsync_core::events::EventBroadcaster;
//! use invsync_storage::EventedStore;
//!
//! let broadcaster = EventBroadcaster::new_shared();
//! let store = EventedStore::new(memory_store, broadcaster);
//!
//! // After this, an InventoryEvent::Created is broadcast
//! store.create(snapshot).await?;
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use invsync_core::events::{EventBroadcaster, InventoryEvent};
use invsync_core::{ResourceId, ResourceKind, ResourceRef, ResourceSnapshot, ScopeRef};
use time::OffsetDateTime;
use tracing::debug;

use crate::error::StorageError;
use crate::traits::LocalStore;
use crate::types::{StalePage, StaleQuery};

/// Delegates every call to `inner` and emits an [`InventoryEvent`] after each
/// successful mutation. Failed mutations emit nothing.
///
/// Batches go through the trait's default `execute_batch`, so every batch
/// member is reported individually.
pub struct EventedStore<S: LocalStore> {
    inner: S,
    broadcaster: Arc<EventBroadcaster>,
}

impl<S: LocalStore> EventedStore<S> {
    pub fn new(inner: S, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { inner, broadcaster }
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    fn emit(&self, event: InventoryEvent) {
        if !self.broadcaster.has_subscribers() {
            return;
        }
        let event_type = event.event_type;
        let kind = event.kind;
        let resource_id = event.resource_id.clone();
        let count = self.broadcaster.send_inventory(event);
        debug!(
            event = %event_type,
            kind = %kind,
            resource_id = %resource_id,
            subscribers = count,
            "Emitted inventory event"
        );
    }
}

#[async_trait]
impl<S: LocalStore> LocalStore for EventedStore<S> {
    async fn read(&self, target: &ResourceRef) -> Result<Option<ResourceSnapshot>, StorageError> {
        self.inner.read(target).await
    }

    async fn query_by_ids(
        &self,
        scope: &ScopeRef,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> Result<Vec<ResourceSnapshot>, StorageError> {
        self.inner.query_by_ids(scope, kind, ids).await
    }

    async fn query_stale(&self, query: &StaleQuery) -> Result<StalePage, StorageError> {
        self.inner.query_stale(query).await
    }

    async fn create(&self, snapshot: ResourceSnapshot) -> Result<ResourceSnapshot, StorageError> {
        let created = self.inner.create(snapshot).await?;
        self.emit(InventoryEvent::created(created.kind, created.id.clone()));
        Ok(created)
    }

    async fn update(&self, snapshot: ResourceSnapshot) -> Result<ResourceSnapshot, StorageError> {
        let updated = self.inner.update(snapshot).await?;
        self.emit(InventoryEvent::updated(updated.kind, updated.id.clone()));
        Ok(updated)
    }

    async fn delete(&self, target: &ResourceRef) -> Result<(), StorageError> {
        self.inner.delete(target).await?;
        self.emit(InventoryEvent::deleted(target.kind, target.id.clone()));
        Ok(())
    }

    async fn retire(&self, target: &ResourceRef, at: OffsetDateTime) -> Result<(), StorageError> {
        self.inner.retire(target, at).await?;
        self.emit(InventoryEvent::retired(target.kind, target.id.clone()));
        Ok(())
    }

    fn max_query_ids(&self) -> usize {
        self.inner.max_query_ids()
    }

    fn backend_name(&self) -> &'static str {
        self.inner.backend_name()
    }
}

impl<S: LocalStore> std::fmt::Debug for EventedStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventedStore")
            .field("backend", &self.inner.backend_name())
            .field("subscriber_count", &self.broadcaster.subscriber_count())
            .finish()
    }
}
