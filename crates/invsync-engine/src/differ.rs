//! Local side of the diff: bounded match queries and the staleness sweep.

use std::collections::{BTreeMap, HashMap, HashSet};

use invsync_core::{ResourceId, ResourceKind, ResourceRef, ResourceSnapshot, ScopeRef};
use invsync_storage::{LocalCursor, LocalStore, StaleQuery};
use time::OffsetDateTime;
use tracing::debug;

use crate::config::EngineConfig;
use crate::error::EngineError;

pub struct LocalDiffer<'a> {
    store: &'a dyn LocalStore,
    chunk_size: usize,
    page_size: usize,
}

/// One page of sweep output.
#[derive(Debug, Default)]
pub struct SweepPage {
    /// Stale records absent from every remote page.
    pub candidates: Vec<ResourceSnapshot>,
    /// Stale records still present remotely, left alone.
    pub protected: usize,
    pub next_cursor: Option<LocalCursor>,
}

impl<'a> LocalDiffer<'a> {
    pub fn new(store: &'a dyn LocalStore, config: &EngineConfig) -> Self {
        Self {
            store,
            chunk_size: config.match_chunk_size(store.max_query_ids()),
            page_size: config.sweep_page_size,
        }
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Finds the local records for `ids`, issuing one query per chunk.
    ///
    /// # Errors
    ///
    /// A failed chunk fails the whole match with `EngineError::StoreQuery`.
    pub async fn match_existing(
        &self,
        scope: &ScopeRef,
        kind: ResourceKind,
        ids: &[ResourceId],
    ) -> Result<HashMap<ResourceId, ResourceSnapshot>, EngineError> {
        let mut found = HashMap::with_capacity(ids.len());
        for (index, chunk) in ids.chunks(self.chunk_size).enumerate() {
            let records = self
                .store
                .query_by_ids(scope, kind, chunk)
                .await
                .map_err(|e| EngineError::store_query("match", e))?;
            debug!(
                kind = %kind,
                chunk = index,
                requested = chunk.len(),
                matched = records.len(),
                "Match query chunk"
            );
            found.extend(records.into_iter().map(|record| (record.id.clone(), record)));
        }
        Ok(found)
    }

    /// Which of `targets` exist locally, queried per kind.
    pub async fn existing_refs(
        &self,
        scope: &ScopeRef,
        targets: impl IntoIterator<Item = ResourceRef>,
    ) -> Result<HashSet<ResourceRef>, EngineError> {
        let mut by_kind: BTreeMap<ResourceKind, Vec<ResourceId>> = BTreeMap::new();
        for target in targets {
            let ids = by_kind.entry(target.kind).or_default();
            if !ids.contains(&target.id) {
                ids.push(target.id);
            }
        }

        let mut present = HashSet::new();
        for (kind, ids) in by_kind {
            let found = self.match_existing(scope, kind, &ids).await?;
            present.extend(found.into_keys().map(|id| ResourceRef::new(kind, id)));
        }
        Ok(present)
    }

    /// Reads one sweep page and drops the records `seen_remotely` protects.
    ///
    /// Must only run after remote pagination is drained.
    pub async fn sweep_page(
        &self,
        scope: &ScopeRef,
        kind: ResourceKind,
        before: OffsetDateTime,
        cursor: Option<LocalCursor>,
        seen_remotely: impl Fn(&ResourceId) -> bool,
    ) -> Result<SweepPage, EngineError> {
        let query = StaleQuery::new(scope.clone(), kind, before, self.page_size).with_cursor(cursor);
        let page = self
            .store
            .query_stale(&query)
            .await
            .map_err(|e| EngineError::store_query("sweep", e))?;

        let stale = page.entries.len();
        let candidates: Vec<ResourceSnapshot> = page
            .entries
            .into_iter()
            .filter(|record| !seen_remotely(&record.id))
            .collect();
        let protected = stale - candidates.len();

        debug!(
            kind = %kind,
            stale,
            candidates = candidates.len(),
            protected,
            "Sweep page"
        );

        Ok(SweepPage {
            candidates,
            protected,
            next_cursor: page.next_cursor,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invsync_db_memory::{InMemoryStore, StoreOptions};
    use time::Duration;

    fn scope() -> ScopeRef {
        ScopeRef::new("t", "sub").unwrap()
    }

    fn seed(store: &InMemoryStore, id: &str, kind: ResourceKind, at: OffsetDateTime) {
        store.seed(ResourceSnapshot::new(
            ResourceId::new(id).unwrap(),
            kind,
            scope(),
            id,
            at,
        ));
    }

    #[tokio::test]
    async fn test_match_chunks_below_store_limit() {
        let store = InMemoryStore::with_options(StoreOptions { max_query_ids: 3 });
        for i in 0..10 {
            seed(&store, &format!("d-{i}"), ResourceKind::Disk, OffsetDateTime::UNIX_EPOCH);
        }
        let differ = LocalDiffer::new(&store, &EngineConfig::default());
        assert_eq!(differ.chunk_size(), 3);

        let ids: Vec<ResourceId> = (0..12)
            .map(|i| ResourceId::new(format!("D-{i}")).unwrap())
            .collect();
        let found = differ
            .match_existing(&scope(), ResourceKind::Disk, &ids)
            .await
            .unwrap();
        assert_eq!(found.len(), 10);
        assert!(found.contains_key(&ResourceId::new("d-9").unwrap()));
    }

    #[tokio::test]
    async fn test_existing_refs_groups_by_kind() {
        let store = InMemoryStore::new();
        seed(&store, "rg-1", ResourceKind::ResourceGroup, OffsetDateTime::UNIX_EPOCH);
        let differ = LocalDiffer::new(&store, &EngineConfig::default());

        let present = differ
            .existing_refs(
                &scope(),
                vec![
                    ResourceRef::new(ResourceKind::ResourceGroup, ResourceId::new("RG-1").unwrap()),
                    ResourceRef::new(ResourceKind::ResourceGroup, ResourceId::new("rg-1").unwrap()),
                    ResourceRef::new(ResourceKind::ResourceGroup, ResourceId::new("rg-2").unwrap()),
                ],
            )
            .await
            .unwrap();
        assert_eq!(present.len(), 1);
    }

    #[tokio::test]
    async fn test_sweep_page_skips_remotely_seen_ids() {
        let store = InMemoryStore::new();
        let start = OffsetDateTime::UNIX_EPOCH + Duration::hours(1);
        seed(&store, "d-1", ResourceKind::Disk, OffsetDateTime::UNIX_EPOCH);
        seed(&store, "d-2", ResourceKind::Disk, OffsetDateTime::UNIX_EPOCH);
        seed(&store, "d-3", ResourceKind::Disk, start);

        let differ = LocalDiffer::new(&store, &EngineConfig::default());
        let seen = ResourceId::new("d-2").unwrap();
        let page = differ
            .sweep_page(&scope(), ResourceKind::Disk, start, None, |id| id == &seen)
            .await
            .unwrap();

        let ids: Vec<&str> = page.candidates.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["d-1"]);
        assert_eq!(page.protected, 1);
        assert!(page.next_cursor.is_none());
    }
}
