use std::collections::BTreeMap;

use invsync_core::{
    PowerState, RemoteResource, ResourceId, ResourceKind, ResourceRef, ResourceSnapshot,
};
use serde::Deserialize;
use serde_json::json;
use tracing::warn;

use crate::adapter::{
    EnrichmentStep, ResourceAdapter, copy_scalar_properties, enrichment_key, linked_ref,
};
use crate::adapters::network_interface::PUBLIC_ADDRESS_ID;
use crate::adapters::plain::PlainAdapter;
use crate::collaborators::LookupKind;

/// Listing entry of a disk attached to a virtual machine.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AttachedDisk {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    size_gb: Option<u64>,
    #[serde(default)]
    sku: Option<String>,
}

/// Virtual machines, their attached disks and their live state.
#[derive(Debug, Clone, Copy)]
pub struct VirtualMachineAdapter {
    disks: PlainAdapter,
}

impl VirtualMachineAdapter {
    pub const fn new() -> Self {
        Self {
            disks: PlainAdapter::disks(),
        }
    }
}

impl Default for VirtualMachineAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceAdapter for VirtualMachineAdapter {
    fn name(&self) -> &'static str {
        "virtual-machines"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::VirtualMachine
    }

    fn provider_properties(&self, remote: &RemoteResource) -> BTreeMap<String, String> {
        copy_scalar_properties(
            remote,
            &[
                ("vmSize", "size"),
                ("osType", "os-type"),
                ("provisioningState", "provisioning-state"),
            ],
        )
    }

    fn links(&self, remote: &RemoteResource) -> Vec<(&'static str, ResourceRef)> {
        let mut links = Vec::new();
        if let Some(nic) = linked_ref(remote, "network-interface", ResourceKind::NetworkInterface) {
            links.push(("network-interface", nic));
        }
        if let Some(group) = linked_ref(remote, "resource-group", ResourceKind::ResourceGroup) {
            links.push(("resource-group", group));
        }
        links
    }

    fn dependents(&self, remote: &RemoteResource) -> Vec<RemoteResource> {
        let Some(entries) = remote.properties.get("disks") else {
            return Vec::new();
        };
        let disks: Vec<AttachedDisk> = match serde_json::from_value(entries.clone()) {
            Ok(disks) => disks,
            Err(e) => {
                warn!(vm = %remote.id, error = %e, "Ignoring malformed disk list");
                return Vec::new();
            }
        };

        disks
            .into_iter()
            .filter_map(|disk| {
                let id = match ResourceId::new(&disk.id) {
                    Ok(id) => id,
                    Err(e) => {
                        warn!(vm = %remote.id, error = %e, "Ignoring attached disk without id");
                        return None;
                    }
                };
                let name = disk.name.unwrap_or_else(|| id.to_string());
                let mut dependent = RemoteResource::new(id, ResourceKind::Disk, name)
                    .with_properties(json!({ "sizeGb": disk.size_gb, "sku": disk.sku }));
                dependent.region = remote.region.clone();
                if let Some(group) = remote.link("resource-group") {
                    dependent = dependent.with_link("resource-group", group.clone());
                }
                Some(dependent)
            })
            .collect()
    }

    fn dependent_adapter(&self) -> Option<&dyn ResourceAdapter> {
        Some(&self.disks)
    }

    fn enrichment_plan(&self, snapshot: &ResourceSnapshot) -> Vec<EnrichmentStep> {
        let mut steps = vec![EnrichmentStep::Direct {
            lookup: LookupKind::PowerState,
            target: snapshot.id.clone(),
        }];
        if let Some(nic) = snapshot.link("network-interface") {
            steps.push(EnrichmentStep::Chained {
                lookup: LookupKind::PublicAddress,
                via: nic.clone(),
                property: PUBLIC_ADDRESS_ID,
            });
        }
        steps
    }

    fn apply_enrichment(&self, snapshot: &mut ResourceSnapshot, lookup: LookupKind, value: &str) {
        match lookup {
            LookupKind::PowerState => {
                snapshot.power_state = Some(PowerState::from_provider(value));
            }
            LookupKind::PublicAddress => {
                snapshot
                    .custom_properties
                    .insert(enrichment_key(lookup.as_str()), value.to_string());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapter::{Mapping, MappingContext};
    use invsync_core::ScopeRef;
    use std::collections::HashSet;
    use time::OffsetDateTime;

    fn vm() -> RemoteResource {
        RemoteResource::new(
            ResourceId::new("VM-001").unwrap(),
            ResourceKind::VirtualMachine,
            "web-1",
        )
        .with_region("eastus")
        .with_link("network-interface", ResourceId::new("NIC-1").unwrap())
        .with_properties(json!({
            "vmSize": "Standard_B2s",
            "disks": [
                {"id": "DISK-OS", "name": "web-1-os", "sizeGb": 64},
                {"id": "disk-data", "sku": "Premium_LRS"},
                {"id": "  "}
            ]
        }))
    }

    #[test]
    fn test_dependents_become_attached_disks() {
        let adapter = VirtualMachineAdapter::new();
        let dependents = adapter.dependents(&vm());
        assert_eq!(dependents.len(), 2);
        assert!(dependents.iter().all(|d| d.kind == ResourceKind::Disk));
        assert_eq!(dependents[0].id.as_str(), "disk-os");
        assert_eq!(dependents[0].region.as_deref(), Some("eastus"));
        assert_eq!(dependents[1].name, "disk-data");

        let scope = ScopeRef::new("t", "sub").unwrap();
        let present = HashSet::new();
        let ctx = MappingContext::new(&scope, OffsetDateTime::UNIX_EPOCH, &present);
        let Mapping::Mapped(snapshot) = adapter.build_snapshot(&vm(), &ctx) else {
            panic!("expected mapping");
        };
        assert_eq!(snapshot.attached.len(), 2);
        assert_eq!(snapshot.provider_property("size"), Some("Standard_B2s"));
        assert_eq!(snapshot.power_state, Some(PowerState::Unknown));
    }

    #[test]
    fn test_enrichment_plan_chains_through_interface() {
        let adapter = VirtualMachineAdapter::new();
        let scope = ScopeRef::new("t", "sub").unwrap();
        let present = HashSet::new();
        let ctx = MappingContext::new(&scope, OffsetDateTime::UNIX_EPOCH, &present);
        let Mapping::Mapped(mut snapshot) = adapter.build_snapshot(&vm(), &ctx) else {
            panic!("expected mapping");
        };

        let plan = adapter.enrichment_plan(&snapshot);
        assert_eq!(plan.len(), 2);
        assert!(matches!(
            &plan[1],
            EnrichmentStep::Chained { via, .. } if via.id.as_str() == "nic-1"
        ));

        adapter.apply_enrichment(&mut snapshot, LookupKind::PowerState, "PowerState/running");
        adapter.apply_enrichment(&mut snapshot, LookupKind::PublicAddress, "20.1.2.3");
        assert_eq!(snapshot.power_state, Some(PowerState::On));
        assert_eq!(
            snapshot.custom_properties.get("enriched:public-address").map(String::as_str),
            Some("20.1.2.3")
        );
    }
}
