use std::collections::{BTreeMap, HashMap};

use invsync_core::{EnumerationKey, RemoteResource, ResourceId, ResourceSnapshot};
use invsync_storage::LocalCursor;
use time::OffsetDateTime;

use crate::collaborators::{Credentials, RemoteCursor};
use crate::error::EngineError;
use crate::registry::CycleToken;
use crate::report::CycleStats;
use crate::request::{Action, DeletionPolicy};

/// Transient state of one enumeration run. Dropped on the terminal stage.
#[derive(Debug)]
pub struct Cycle {
    pub key: EnumerationKey,
    pub action: Action,
    pub policy: DeletionPolicy,
    pub start_timestamp: Option<OffsetDateTime>,
    pub token: Option<CycleToken>,
    pub credentials: Option<Credentials>,
    /// Every remote resource seen so far. Append-only until sealed.
    remote: HashMap<ResourceId, RemoteResource>,
    sealed: bool,
    /// Ids of the page fetched last, in listing order.
    pub current_page: Vec<ResourceId>,
    pub page_cursor: Option<RemoteCursor>,
    pub sweep_cursor: Option<LocalCursor>,
    /// Records known to be current after reconciliation; enrichment input.
    pub reconciled: BTreeMap<ResourceId, ResourceSnapshot>,
    pub error: Option<EngineError>,
    pub stats: CycleStats,
}

impl Cycle {
    pub fn new(key: EnumerationKey, action: Action, policy: DeletionPolicy) -> Self {
        Self {
            key,
            action,
            policy,
            start_timestamp: None,
            token: None,
            credentials: None,
            remote: HashMap::new(),
            sealed: false,
            current_page: Vec::new(),
            page_cursor: None,
            sweep_cursor: None,
            reconciled: BTreeMap::new(),
            error: None,
            stats: CycleStats::default(),
        }
    }

    /// Merges one page into the remote map and makes it the current page.
    ///
    /// Returns the ids that were already present (last value wins).
    pub fn record_page(
        &mut self,
        items: Vec<RemoteResource>,
    ) -> Result<Vec<ResourceId>, EngineError> {
        if self.sealed {
            return Err(EngineError::unknown_stage(
                "remote page recorded after the sweep started",
            ));
        }

        let mut duplicates = Vec::new();
        self.current_page.clear();
        for item in items {
            let id = item.id.clone();
            if self.remote.insert(id.clone(), item).is_some() {
                duplicates.push(id.clone());
            }
            if !self.current_page.contains(&id) {
                self.current_page.push(id);
            }
        }
        self.stats.pages += 1;
        self.stats.duplicates += duplicates.len();
        self.stats.remote_seen = self.remote.len();
        Ok(duplicates)
    }

    /// Resources of the current page.
    pub fn current_resources(&self) -> Vec<&RemoteResource> {
        self.current_page
            .iter()
            .filter_map(|id| self.remote.get(id))
            .collect()
    }

    pub fn remote(&self, id: &ResourceId) -> Option<&RemoteResource> {
        self.remote.get(id)
    }

    pub fn remote_resources(&self) -> impl Iterator<Item = &RemoteResource> {
        self.remote.values()
    }

    /// Whether the id was part of any remote page of this cycle.
    pub fn seen_remotely(&self, id: &ResourceId) -> bool {
        self.remote.contains_key(id)
    }

    pub fn remote_count(&self) -> usize {
        self.remote.len()
    }

    /// Freezes the remote map; the staleness sweep may begin.
    pub fn seal(&mut self) {
        self.sealed = true;
        self.current_page.clear();
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invsync_core::{ResourceKind, ScopeRef};

    fn cycle() -> Cycle {
        Cycle::new(
            EnumerationKey::new(ScopeRef::new("t", "sub").unwrap(), "disks"),
            Action::Start,
            DeletionPolicy::Delete,
        )
    }

    fn disk(id: &str, name: &str) -> RemoteResource {
        RemoteResource::new(ResourceId::new(id).unwrap(), ResourceKind::Disk, name)
    }

    #[test]
    fn test_record_page_last_value_wins_on_duplicates() {
        let mut cycle = cycle();
        assert!(cycle.record_page(vec![disk("d-1", "first")]).unwrap().is_empty());

        let duplicates = cycle
            .record_page(vec![disk("D-1", "second"), disk("d-2", "other")])
            .unwrap();
        assert_eq!(duplicates, vec![ResourceId::new("d-1").unwrap()]);
        assert_eq!(cycle.remote(&ResourceId::new("d-1").unwrap()).unwrap().name, "second");
        assert_eq!(cycle.current_resources().len(), 2);
        assert_eq!(cycle.stats.pages, 2);
        assert_eq!(cycle.stats.remote_seen, 2);
        assert_eq!(cycle.stats.duplicates, 1);
    }

    #[test]
    fn test_sealed_map_rejects_pages() {
        let mut cycle = cycle();
        cycle.record_page(vec![disk("d-1", "a")]).unwrap();
        cycle.seal();
        assert!(cycle.is_sealed());
        assert!(cycle.seen_remotely(&ResourceId::new("D-1").unwrap()));
        assert!(matches!(
            cycle.record_page(vec![disk("d-2", "b")]),
            Err(EngineError::UnknownStage(_))
        ));
    }
}
