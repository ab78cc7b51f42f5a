//! Resource-kind adapters: how provider listings map onto local records.
//!
//! The engine is generic over [`ResourceAdapter`]. An adapter only describes
//! fields and references; the default `build_snapshot`/`apply_update` methods
//! turn that description into snapshots so every kind follows the same
//! ownership rules.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use invsync_core::{
    LifecycleState, RemoteResource, ResourceId, ResourceKind, ResourceRef, ResourceSnapshot,
    ScopeRef,
};
use serde_json::Value;
use time::OffsetDateTime;

use crate::collaborators::LookupKind;

/// Prefix of custom properties written by enrichment lookups.
///
/// Kept apart from provider properties so a listing update does not clear them.
pub const ENRICHMENT_PREFIX: &str = "enriched:";

/// What the reconciler knows while mapping one page.
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    pub scope: &'a ScopeRef,
    pub cycle_start: OffsetDateTime,
    present: &'a HashSet<ResourceRef>,
}

impl<'a> MappingContext<'a> {
    /// `present` holds the required references known to exist locally.
    pub fn new(
        scope: &'a ScopeRef,
        cycle_start: OffsetDateTime,
        present: &'a HashSet<ResourceRef>,
    ) -> Self {
        Self {
            scope,
            cycle_start,
            present,
        }
    }

    pub fn exists(&self, target: &ResourceRef) -> bool {
        self.present.contains(target)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Mapping {
    Mapped(ResourceSnapshot),
    /// Not resolvable this cycle; retried on the next one.
    Skip(String),
}

/// One second-round lookup for a resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrichmentStep {
    /// Look up `target` directly.
    Direct { lookup: LookupKind, target: ResourceId },
    /// Read the local record `via`, take the provider id stored under
    /// `property` and look that id up.
    Chained {
        lookup: LookupKind,
        via: ResourceRef,
        property: &'static str,
    },
}

impl EnrichmentStep {
    pub fn lookup(&self) -> LookupKind {
        match self {
            EnrichmentStep::Direct { lookup, .. } | EnrichmentStep::Chained { lookup, .. } => {
                *lookup
            }
        }
    }
}

pub trait ResourceAdapter: Send + Sync {
    /// Adapter identity, part of the enumeration key.
    fn name(&self) -> &'static str;

    fn kind(&self) -> ResourceKind;

    /// Provider-owned custom properties (unprefixed keys).
    fn provider_properties(&self, _remote: &RemoteResource) -> BTreeMap<String, String> {
        BTreeMap::new()
    }

    /// References that must exist locally before the resource can be mapped.
    ///
    /// `Err` means the listing carries no usable reference at all.
    fn required_links(
        &self,
        _remote: &RemoteResource,
    ) -> Result<Vec<(&'static str, ResourceRef)>, String> {
        Ok(Vec::new())
    }

    /// References recorded as-is, whether or not the target exists yet.
    fn links(&self, _remote: &RemoteResource) -> Vec<(&'static str, ResourceRef)> {
        Vec::new()
    }

    /// First-class records created alongside this resource.
    fn dependents(&self, _remote: &RemoteResource) -> Vec<RemoteResource> {
        Vec::new()
    }

    /// Adapter used to map [`Self::dependents`].
    fn dependent_adapter(&self) -> Option<&dyn ResourceAdapter> {
        None
    }

    fn enrichment_plan(&self, _snapshot: &ResourceSnapshot) -> Vec<EnrichmentStep> {
        Vec::new()
    }

    fn apply_enrichment(&self, _snapshot: &mut ResourceSnapshot, _lookup: LookupKind, _value: &str) {
    }

    /// Maps a resource that has no local record yet.
    fn build_snapshot(&self, remote: &RemoteResource, ctx: &MappingContext<'_>) -> Mapping {
        let links = match resolve_links(self, remote, ctx) {
            Ok(links) => links,
            Err(reason) => return Mapping::Skip(reason),
        };

        let mut snapshot = ResourceSnapshot::new(
            remote.id.clone(),
            self.kind(),
            ctx.scope.clone(),
            remote.name.clone(),
            ctx.cycle_start,
        )
        .with_region(remote.region.clone());
        snapshot.replace_provider_properties(self.provider_properties(remote));
        snapshot.replace_provider_tags(&remote.tags);
        snapshot.links = links;
        snapshot.attached = attached_refs(self, remote);
        Mapping::Mapped(snapshot)
    }

    /// Applies provider fields to an existing record.
    ///
    /// Identity, locally-set properties and tags, enrichment values and the
    /// power state are left untouched. A retired record is reactivated.
    /// `last_updated_at` is not changed here.
    fn apply_update(
        &self,
        existing: &ResourceSnapshot,
        remote: &RemoteResource,
        ctx: &MappingContext<'_>,
    ) -> Mapping {
        let links = match resolve_links(self, remote, ctx) {
            Ok(links) => links,
            Err(reason) => return Mapping::Skip(reason),
        };

        let mut next = existing.clone();
        next.name = remote.name.clone();
        if remote.region.is_some() {
            next.region = remote.region.clone();
        }
        next.replace_provider_properties(self.provider_properties(remote));
        next.replace_provider_tags(&remote.tags);
        next.links = links;
        next.attached = attached_refs(self, remote);
        next.lifecycle = LifecycleState::Active;
        Mapping::Mapped(next)
    }
}

fn resolve_links<A: ResourceAdapter + ?Sized>(
    adapter: &A,
    remote: &RemoteResource,
    ctx: &MappingContext<'_>,
) -> Result<BTreeMap<String, ResourceRef>, String> {
    let mut links = BTreeMap::new();
    for (role, target) in adapter.required_links(remote)? {
        if !ctx.exists(&target) {
            return Err(format!("{role} {target} is not synchronized yet"));
        }
        links.insert(role.to_string(), target);
    }
    for (role, target) in adapter.links(remote) {
        links.insert(role.to_string(), target);
    }
    Ok(links)
}

fn attached_refs<A: ResourceAdapter + ?Sized>(
    adapter: &A,
    remote: &RemoteResource,
) -> BTreeSet<ResourceRef> {
    adapter
        .dependents(remote)
        .into_iter()
        .map(|dependent| ResourceRef::new(dependent.kind, dependent.id))
        .collect()
}

/// Custom property key for an enrichment value.
pub fn enrichment_key(name: &str) -> String {
    format!("{ENRICHMENT_PREFIX}{name}")
}

/// Renders a scalar JSON value as a property string.
pub fn scalar(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Copies scalar top-level payload fields into properties, renamed per `fields`
/// (`(payload_key, property_name)`).
pub fn copy_scalar_properties(
    remote: &RemoteResource,
    fields: &[(&str, &str)],
) -> BTreeMap<String, String> {
    fields
        .iter()
        .filter_map(|(payload_key, property)| {
            remote
                .properties
                .get(*payload_key)
                .and_then(scalar)
                .map(|value| (property.to_string(), value))
        })
        .collect()
}

/// Reference built from a linked provider id, if the listing carries one.
pub fn linked_ref(remote: &RemoteResource, role: &str, kind: ResourceKind) -> Option<ResourceRef> {
    remote
        .link(role)
        .map(|id| ResourceRef::new(kind, id.clone()))
}
