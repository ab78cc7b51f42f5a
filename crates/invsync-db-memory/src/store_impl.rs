//! LocalStore trait implementation for InMemoryStore.

use async_trait::async_trait;
use invsync_core::{ResourceId, ResourceKind, ResourceRef, ResourceSnapshot, ScopeRef};
use invsync_storage::{LocalStore, StalePage, StaleQuery, StorageError};
use time::OffsetDateTime;

use crate::storage::InMemoryStore;

#[async_trait]
impl LocalStore for InMemoryStore {
    async fn read(&self, target: &ResourceRef) -> Result<Option<ResourceSnapshot>, StorageError> {
        Ok(self.get(target))
    }

    async fn query_by_ids(
        &self,
        scope: &ScopeRef,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> Result<Vec<ResourceSnapshot>, StorageError> {
        self.by_ids(scope, kind, ids)
    }

    async fn query_stale(&self, query: &StaleQuery) -> Result<StalePage, StorageError> {
        self.stale_page(query)
    }

    async fn create(&self, snapshot: ResourceSnapshot) -> Result<ResourceSnapshot, StorageError> {
        self.insert_new(snapshot)
    }

    async fn update(&self, snapshot: ResourceSnapshot) -> Result<ResourceSnapshot, StorageError> {
        self.replace(snapshot)
    }

    async fn delete(&self, target: &ResourceRef) -> Result<(), StorageError> {
        self.remove(target)
    }

    async fn retire(&self, target: &ResourceRef, at: OffsetDateTime) -> Result<(), StorageError> {
        self.mark_retired(target, at)
    }

    fn max_query_ids(&self) -> usize {
        self.options().max_query_ids
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
