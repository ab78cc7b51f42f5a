use std::collections::BTreeMap;

use invsync_core::{RemoteResource, ResourceKind, ResourceRef};

use crate::adapter::{ResourceAdapter, copy_scalar_properties, linked_ref};

/// Provider property holding the id of the public address attached to an interface.
pub const PUBLIC_ADDRESS_ID: &str = "public-address-id";

#[derive(Debug, Default, Clone, Copy)]
pub struct NetworkInterfaceAdapter;

impl ResourceAdapter for NetworkInterfaceAdapter {
    fn name(&self) -> &'static str {
        "network-interfaces"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::NetworkInterface
    }

    fn provider_properties(&self, remote: &RemoteResource) -> BTreeMap<String, String> {
        let mut properties = copy_scalar_properties(
            remote,
            &[("privateIp", "private-ip"), ("macAddress", "mac-address")],
        );
        if let Some(address) = remote.link("public-address") {
            properties.insert(PUBLIC_ADDRESS_ID.to_string(), address.to_string());
        }
        properties
    }

    fn links(&self, remote: &RemoteResource) -> Vec<(&'static str, ResourceRef)> {
        [
            ("network", ResourceKind::Network),
            ("resource-group", ResourceKind::ResourceGroup),
        ]
        .into_iter()
        .filter_map(|(role, kind)| linked_ref(remote, role, kind).map(|target| (role, target)))
        .collect()
    }
}
