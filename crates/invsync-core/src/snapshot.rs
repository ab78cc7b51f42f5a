use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use time::OffsetDateTime;

use crate::id::ResourceId;
use crate::kind::ResourceKind;
use crate::scope::ScopeRef;

/// Prefix of custom property keys and tag references written from provider data.
///
/// Anything without this prefix was set locally and survives updates.
pub const PROVIDER_PREFIX: &str = "provider:";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    #[default]
    Active,
    Retired,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PowerState {
    On,
    Off,
    Suspended,
    #[default]
    Unknown,
}

impl PowerState {
    /// Maps provider status strings (`PowerState/running`, `stopped`, ...) to a power state.
    pub fn from_provider(status: &str) -> Self {
        let status = status.to_ascii_lowercase();
        let code = status.rsplit('/').next().unwrap_or(status.as_str());
        match code {
            "running" | "starting" | "on" => PowerState::On,
            "stopped" | "stopping" | "deallocated" | "deallocating" | "off" => PowerState::Off,
            "suspended" | "paused" => PowerState::Suspended,
            _ => PowerState::Unknown,
        }
    }
}

/// Typed pointer to a local record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceRef {
    pub kind: ResourceKind,
    pub id: ResourceId,
}

impl ResourceRef {
    pub fn new(kind: ResourceKind, id: ResourceId) -> Self {
        Self { kind, id }
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

/// Local inventory record for one provider resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSnapshot {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    pub parent_scope: ScopeRef,
    #[serde(default)]
    pub custom_properties: BTreeMap<String, String>,
    #[serde(default)]
    pub tag_refs: BTreeSet<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub last_updated_at: OffsetDateTime,
    #[serde(default)]
    pub lifecycle: LifecycleState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_state: Option<PowerState>,
    /// Resolved references to other local records, keyed by role.
    #[serde(default)]
    pub links: BTreeMap<String, ResourceRef>,
    /// First-class dependents removed together with this record on hard delete.
    #[serde(default)]
    pub attached: BTreeSet<ResourceRef>,
}

impl ResourceSnapshot {
    pub fn new(
        id: ResourceId,
        kind: ResourceKind,
        parent_scope: ScopeRef,
        name: impl Into<String>,
        last_updated_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            region: None,
            parent_scope,
            custom_properties: BTreeMap::new(),
            tag_refs: BTreeSet::new(),
            last_updated_at,
            lifecycle: LifecycleState::Active,
            power_state: kind.has_power_state().then_some(PowerState::Unknown),
            links: BTreeMap::new(),
            attached: BTreeSet::new(),
        }
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn reference(&self) -> ResourceRef {
        ResourceRef::new(self.kind, self.id.clone())
    }

    pub fn is_retired(&self) -> bool {
        self.lifecycle == LifecycleState::Retired
    }

    /// Soft-delete: powered off and marked retired, record kept.
    pub fn retire(&mut self, at: OffsetDateTime) {
        self.lifecycle = LifecycleState::Retired;
        if self.kind.has_power_state() {
            self.power_state = Some(PowerState::Off);
        }
        self.last_updated_at = at;
    }

    pub fn set_provider_property(&mut self, key: &str, value: impl Into<String>) {
        self.custom_properties
            .insert(format!("{PROVIDER_PREFIX}{key}"), value.into());
    }

    pub fn provider_property(&self, key: &str) -> Option<&str> {
        self.custom_properties
            .get(&format!("{PROVIDER_PREFIX}{key}"))
            .map(String::as_str)
    }

    /// Replaces every provider-owned custom property, leaving local ones untouched.
    pub fn replace_provider_properties<I, K, V>(&mut self, properties: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        self.custom_properties
            .retain(|key, _| !key.starts_with(PROVIDER_PREFIX));
        for (key, value) in properties {
            self.set_provider_property(key.as_ref(), value);
        }
    }

    /// Replaces every provider-owned tag reference, leaving local ones untouched.
    pub fn replace_provider_tags<I, K, V>(&mut self, tags: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.tag_refs.retain(|tag| !tag.starts_with(PROVIDER_PREFIX));
        for (key, value) in tags {
            self.tag_refs.insert(format!(
                "{PROVIDER_PREFIX}{}={}",
                key.as_ref(),
                value.as_ref()
            ));
        }
    }

    pub fn link(&self, role: &str) -> Option<&ResourceRef> {
        self.links.get(role)
    }
}
