use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::id::ResourceId;
use crate::kind::ResourceKind;

/// A resource as returned by a provider listing call.
///
/// Only the fields the listing exposes are present. `links` carries raw
/// provider ids of related resources (owning resource group, attached network
/// interface, ...), keyed by role. Never persisted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteResource {
    pub id: ResourceId,
    pub kind: ResourceKind,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    #[serde(default)]
    pub links: BTreeMap<String, Vec<ResourceId>>,
    /// Provider-specific payload, opaque to the engine.
    #[serde(default)]
    pub properties: Value,
}

impl RemoteResource {
    pub fn new(id: ResourceId, kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            region: None,
            tags: BTreeMap::new(),
            links: BTreeMap::new(),
            properties: Value::Null,
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_link(mut self, role: impl Into<String>, id: ResourceId) -> Self {
        self.links.entry(role.into()).or_default().push(id);
        self
    }

    pub fn with_properties(mut self, properties: Value) -> Self {
        self.properties = properties;
        self
    }

    /// First linked id for a role.
    pub fn link(&self, role: &str) -> Option<&ResourceId> {
        self.links.get(role).and_then(|ids| ids.first())
    }

    pub fn links_for(&self, role: &str) -> &[ResourceId] {
        self.links.get(role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// String-valued property at a top-level key of the provider payload.
    pub fn property_str(&self, key: &str) -> Option<&str> {
        self.properties.get(key).and_then(Value::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_and_links() {
        let rg = ResourceId::new("RG-1").unwrap();
        let remote = RemoteResource::new(
            ResourceId::new("NSG-1").unwrap(),
            ResourceKind::SecurityGroup,
            "nsg-1",
        )
        .with_region("westeurope")
        .with_link("resource-group", rg.clone())
        .with_properties(json!({"provisioningState": "Succeeded"}));

        assert_eq!(remote.link("resource-group"), Some(&rg));
        assert!(remote.links_for("network-interface").is_empty());
        assert_eq!(remote.property_str("provisioningState"), Some("Succeeded"));
    }

    #[test]
    fn test_deserialize_minimal() {
        let remote: RemoteResource = serde_json::from_value(json!({
            "id": "DISK-9",
            "kind": "disk",
            "name": "os-disk"
        }))
        .unwrap();
        assert_eq!(remote.id.as_str(), "disk-9");
        assert!(remote.properties.is_null());
    }
}
