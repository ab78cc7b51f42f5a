use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use invsync_core::{ResourceId, ResourceKind, ResourceRef, ResourceSnapshot, ScopeRef};
use invsync_storage::{LocalCursor, StalePage, StaleQuery, StorageError};
use papaya::HashMap as PapayaHashMap;
use serde::Serialize;
use time::OffsetDateTime;

use crate::factory::StoreOptions;

pub type StorageKey = String; // Format: "kind/normalized-id"

pub(crate) fn make_storage_key(kind: ResourceKind, id: &ResourceId) -> StorageKey {
    format!("{kind}/{id}")
}

/// Counters of successful mutations, for diagnostics and tests.
#[derive(Debug, Default)]
pub struct StoreStats {
    creates: AtomicU64,
    updates: AtomicU64,
    deletes: AtomicU64,
    retires: AtomicU64,
}

/// Point-in-time copy of [`StoreStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreStatsSnapshot {
    pub creates: u64,
    pub updates: u64,
    pub deletes: u64,
    pub retires: u64,
}

impl StoreStats {
    pub fn snapshot(&self) -> StoreStatsSnapshot {
        StoreStatsSnapshot {
            creates: self.creates.load(Ordering::Relaxed),
            updates: self.updates.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            retires: self.retires.load(Ordering::Relaxed),
        }
    }
}

/// In-memory local store using papaya lock-free HashMap.
///
/// This storage implementation provides:
/// - Lock-free concurrent access via papaya::HashMap
/// - Per-record atomic create/update/delete/retire
/// - Keyset-paginated staleness queries that stay correct while the
///   sweep deletes records between pages
/// - A configurable match-query size limit
#[derive(Debug)]
pub struct InMemoryStore {
    pub(crate) data: Arc<PapayaHashMap<StorageKey, ResourceSnapshot>>,
    stats: Arc<StoreStats>,
    options: StoreOptions,
}

impl InMemoryStore {
    /// Creates a new in-memory store with default options.
    pub fn new() -> Self {
        Self::with_options(StoreOptions::default())
    }

    /// Creates a new in-memory store with the given options.
    pub fn with_options(options: StoreOptions) -> Self {
        Self {
            data: Arc::new(PapayaHashMap::new()),
            stats: Arc::new(StoreStats::default()),
            options,
        }
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn stats(&self) -> StoreStatsSnapshot {
        self.stats.snapshot()
    }

    /// Inserts or replaces a record without touching the counters.
    ///
    /// Meant for seeding fixtures.
    pub fn seed(&self, snapshot: ResourceSnapshot) {
        let key = make_storage_key(snapshot.kind, &snapshot.id);
        let guard = self.data.pin();
        guard.insert(key, snapshot);
    }

    pub fn len(&self) -> usize {
        self.data.pin().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies all records of a kind, sorted by id.
    pub fn records_of(&self, kind: ResourceKind) -> Vec<ResourceSnapshot> {
        let guard = self.data.pin();
        let mut records: Vec<ResourceSnapshot> = guard
            .iter()
            .filter(|(_, snapshot)| snapshot.kind == kind)
            .map(|(_, snapshot)| snapshot.clone())
            .collect();
        records.sort_by(|a, b| a.id.cmp(&b.id));
        records
    }

    pub(crate) fn get(&self, target: &ResourceRef) -> Option<ResourceSnapshot> {
        let key = make_storage_key(target.kind, &target.id);
        let guard = self.data.pin();
        guard.get(&key).cloned()
    }

    pub(crate) fn by_ids(
        &self,
        scope: &ScopeRef,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> Result<Vec<ResourceSnapshot>, StorageError> {
        let limit = self.options.max_query_ids;
        if ids.len() > limit {
            return Err(StorageError::query_too_large(ids.len(), limit));
        }

        let guard = self.data.pin();
        Ok(ids
            .iter()
            .filter_map(|id| guard.get(&make_storage_key(kind, id)))
            .filter(|snapshot| &snapshot.parent_scope == scope)
            .cloned()
            .collect())
    }

    /// One page of active records last updated before `query.before`.
    ///
    /// The cursor is the id of the last record of the previous page; the next
    /// page starts strictly after it, so deleting already-returned records
    /// does not shift later pages.
    pub(crate) fn stale_page(&self, query: &StaleQuery) -> Result<StalePage, StorageError> {
        let after = query
            .cursor
            .as_ref()
            .map(|cursor| {
                ResourceId::new(cursor.as_str())
                    .map_err(|e| StorageError::invalid_cursor(e.to_string()))
            })
            .transpose()?;

        let mut candidates: Vec<ResourceSnapshot> = {
            let guard = self.data.pin();
            guard
                .iter()
                .map(|(_, snapshot)| snapshot)
                .filter(|snapshot| {
                    snapshot.kind == query.kind
                        && snapshot.parent_scope == query.scope
                        && !snapshot.is_retired()
                        && snapshot.last_updated_at < query.before
                        && after.as_ref().is_none_or(|after| &snapshot.id > after)
                })
                .cloned()
                .collect()
        };
        candidates.sort_by(|a, b| a.id.cmp(&b.id));

        let page_size = query.page_size.max(1);
        let has_more = candidates.len() > page_size;
        candidates.truncate(page_size);

        let next_cursor = if has_more {
            candidates
                .last()
                .and_then(|last| LocalCursor::new(last.id.as_str()))
        } else {
            None
        };

        Ok(StalePage {
            entries: candidates,
            next_cursor,
        })
    }

    pub(crate) fn insert_new(
        &self,
        snapshot: ResourceSnapshot,
    ) -> Result<ResourceSnapshot, StorageError> {
        let target = snapshot.reference();
        let key = make_storage_key(snapshot.kind, &snapshot.id);
        {
            let guard = self.data.pin();
            if guard.try_insert(key, snapshot.clone()).is_err() {
                return Err(StorageError::already_exists(&target));
            }
        }
        self.stats.creates.fetch_add(1, Ordering::Relaxed);
        Ok(snapshot)
    }

    pub(crate) fn replace(
        &self,
        snapshot: ResourceSnapshot,
    ) -> Result<ResourceSnapshot, StorageError> {
        let target = snapshot.reference();
        let key = make_storage_key(snapshot.kind, &snapshot.id);
        {
            let guard = self.data.pin();
            if guard.update(key, |_| snapshot.clone()).is_none() {
                return Err(StorageError::not_found(&target));
            }
        }
        self.stats.updates.fetch_add(1, Ordering::Relaxed);
        Ok(snapshot)
    }

    pub(crate) fn remove(&self, target: &ResourceRef) -> Result<(), StorageError> {
        let key = make_storage_key(target.kind, &target.id);
        {
            let guard = self.data.pin();
            if guard.remove(&key).is_none() {
                return Err(StorageError::not_found(target));
            }
        }
        self.stats.deletes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    pub(crate) fn mark_retired(
        &self,
        target: &ResourceRef,
        at: OffsetDateTime,
    ) -> Result<(), StorageError> {
        let key = make_storage_key(target.kind, &target.id);
        {
            let guard = self.data.pin();
            let retired = guard.update(key, |current| {
                let mut next = current.clone();
                next.retire(at);
                next
            });
            if retired.is_none() {
                return Err(StorageError::not_found(target));
            }
        }
        self.stats.retires.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
