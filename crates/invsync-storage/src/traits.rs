//! Storage traits for the local inventory store.

use async_trait::async_trait;
use futures_util::future::join_all;
use time::OffsetDateTime;

use invsync_core::{ResourceId, ResourceKind, ResourceRef, ResourceSnapshot, ScopeRef};

use crate::error::StorageError;
use crate::types::{BatchOperation, BatchOutcome, OperationResult, StalePage, StaleQuery};

/// The local inventory store the reconciliation engine reads and mutates.
///
/// Implementations must provide per-record atomic create/update/delete. No
/// cross-record transactions are expected. Implementations must be
/// thread-safe (`Send + Sync`).
///
/// # Example
///
/// ```ignore
/// use invsync_storage::{LocalStore, StorageError};
///
/// async fn exists(store: &dyn LocalStore, target: &ResourceRef) -> Result<bool, StorageError> {
///     Ok(store.read(target).await?.is_some())
/// }
/// ```
#[async_trait]
pub trait LocalStore: Send + Sync {
    // ==================== Reads ====================

    /// Reads a record by reference. Returns `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error only for infrastructure issues, not for missing records.
    async fn read(&self, target: &ResourceRef) -> Result<Option<ResourceSnapshot>, StorageError>;

    /// Returns the records of `kind` in `scope` whose id is one of `ids`.
    ///
    /// Matching is on normalized ids. Missing ids are simply absent from the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::QueryTooLarge` if `ids.len()` exceeds [`Self::max_query_ids`].
    async fn query_by_ids(
        &self,
        scope: &ScopeRef,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> Result<Vec<ResourceSnapshot>, StorageError>;

    /// Returns one page of active records last updated before `query.before`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::InvalidCursor` for a cursor this store did not issue.
    async fn query_stale(&self, query: &StaleQuery) -> Result<StalePage, StorageError>;

    // ==================== Mutations ====================

    /// Creates a new record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::AlreadyExists` if a record with the same kind and id exists.
    async fn create(&self, snapshot: ResourceSnapshot) -> Result<ResourceSnapshot, StorageError>;

    /// Replaces an existing record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn update(&self, snapshot: ResourceSnapshot) -> Result<ResourceSnapshot, StorageError>;

    /// Removes a record.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn delete(&self, target: &ResourceRef) -> Result<(), StorageError>;

    /// Soft-deletes a record: powered off, lifecycle set to retired and
    /// `last_updated_at` set to `at`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the record does not exist.
    async fn retire(&self, target: &ResourceRef, at: OffsetDateTime) -> Result<(), StorageError>;

    // ==================== Batches ====================

    /// Runs all operations concurrently and reports each result.
    ///
    /// A failing member never prevents the others from running. An empty
    /// batch returns an empty outcome immediately.
    async fn execute_batch(&self, operations: Vec<BatchOperation>) -> BatchOutcome {
        let pending = operations.into_iter().map(|operation| async move {
            let target = operation.target();
            let kind = operation.kind();
            let result = match operation {
                BatchOperation::Create(snapshot) => self.create(snapshot).await.map(|_| ()),
                BatchOperation::Update(snapshot) => self.update(snapshot).await.map(|_| ()),
                BatchOperation::Delete(target) => self.delete(&target).await,
                BatchOperation::Retire(target, at) => self.retire(&target, at).await,
            };
            OperationResult {
                target,
                kind,
                result,
            }
        });

        BatchOutcome {
            results: join_all(pending).await,
        }
    }

    // ==================== Metadata ====================

    /// Maximum number of ids accepted by a single [`Self::query_by_ids`] call.
    fn max_query_ids(&self) -> usize;

    /// Returns the name of this storage backend for logging/debugging.
    fn backend_name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Compile-time test that LocalStore is object-safe
    fn _assert_store_object_safe(_: &dyn LocalStore) {}
}
