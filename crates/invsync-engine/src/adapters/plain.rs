use std::collections::BTreeMap;

use invsync_core::{RemoteResource, ResourceKind, ResourceRef};

use crate::adapter::{ResourceAdapter, copy_scalar_properties, linked_ref};

/// Adapter for kinds that map straight from the listing with no
/// dependents, required references or enrichment.
#[derive(Debug, Clone, Copy)]
pub struct PlainAdapter {
    name: &'static str,
    kind: ResourceKind,
    /// `(payload_key, property_name)` pairs copied into provider properties.
    fields: &'static [(&'static str, &'static str)],
}

impl PlainAdapter {
    pub const fn new(
        name: &'static str,
        kind: ResourceKind,
        fields: &'static [(&'static str, &'static str)],
    ) -> Self {
        Self { name, kind, fields }
    }

    pub const fn disks() -> Self {
        Self::new(
            "disks",
            ResourceKind::Disk,
            &[
                ("sizeGb", "size-gb"),
                ("sku", "sku"),
                ("diskState", "disk-state"),
            ],
        )
    }

    pub const fn networks() -> Self {
        Self::new(
            "networks",
            ResourceKind::Network,
            &[("addressSpace", "address-space"), ("provisioningState", "provisioning-state")],
        )
    }

    pub const fn storage_accounts() -> Self {
        Self::new(
            "storage-accounts",
            ResourceKind::StorageAccount,
            &[
                ("sku", "sku"),
                ("accessTier", "access-tier"),
                ("primaryEndpoint", "primary-endpoint"),
            ],
        )
    }

    pub const fn resource_groups() -> Self {
        Self::new(
            "resource-groups",
            ResourceKind::ResourceGroup,
            &[("provisioningState", "provisioning-state")],
        )
    }
}

impl ResourceAdapter for PlainAdapter {
    fn name(&self) -> &'static str {
        self.name
    }

    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn provider_properties(&self, remote: &RemoteResource) -> BTreeMap<String, String> {
        copy_scalar_properties(remote, self.fields)
    }

    fn links(&self, remote: &RemoteResource) -> Vec<(&'static str, ResourceRef)> {
        if self.kind == ResourceKind::ResourceGroup {
            return Vec::new();
        }
        linked_ref(remote, "resource-group", ResourceKind::ResourceGroup)
            .map(|target| vec![("resource-group", target)])
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Mapping, MappingContext};
    use invsync_core::{ResourceId, ScopeRef};
    use serde_json::json;
    use std::collections::HashSet;
    use time::OffsetDateTime;

    #[test]
    fn test_disk_mapping_links_resource_group_without_requiring_it() {
        let scope = ScopeRef::new("t", "sub").unwrap();
        let present = HashSet::new();
        let ctx = MappingContext::new(&scope, OffsetDateTime::UNIX_EPOCH, &present);
        let remote = RemoteResource::new(ResourceId::new("disk-1").unwrap(), ResourceKind::Disk, "os")
            .with_link("resource-group", ResourceId::new("rg-1").unwrap())
            .with_properties(json!({"sizeGb": 128, "sku": "Premium_LRS"}));

        let Mapping::Mapped(snapshot) = PlainAdapter::disks().build_snapshot(&remote, &ctx) else {
            panic!("expected mapping");
        };
        assert_eq!(snapshot.provider_property("size-gb"), Some("128"));
        assert_eq!(snapshot.provider_property("sku"), Some("Premium_LRS"));
        assert!(snapshot.link("resource-group").is_some());
        assert!(snapshot.power_state.is_none());
    }
}
