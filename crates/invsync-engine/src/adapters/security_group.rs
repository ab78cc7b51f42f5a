use std::collections::BTreeMap;

use invsync_core::{RemoteResource, ResourceKind, ResourceRef};
use serde_json::Value;

use crate::adapter::{ResourceAdapter, copy_scalar_properties, linked_ref};

/// Security groups belong to a resource group that must already be in the
/// local inventory; until it is, the group is skipped and picked up by a
/// later cycle.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityGroupAdapter;

impl ResourceAdapter for SecurityGroupAdapter {
    fn name(&self) -> &'static str {
        "security-groups"
    }

    fn kind(&self) -> ResourceKind {
        ResourceKind::SecurityGroup
    }

    fn provider_properties(&self, remote: &RemoteResource) -> BTreeMap<String, String> {
        let mut properties =
            copy_scalar_properties(remote, &[("provisioningState", "provisioning-state")]);
        if let Some(Value::Array(rules)) = remote.properties.get("securityRules") {
            properties.insert("rule-count".to_string(), rules.len().to_string());
        }
        properties
    }

    fn required_links(
        &self,
        remote: &RemoteResource,
    ) -> Result<Vec<(&'static str, ResourceRef)>, String> {
        linked_ref(remote, "resource-group", ResourceKind::ResourceGroup)
            .map(|group| vec![("resource-group", group)])
            .ok_or_else(|| "listing carries no resource group".to_string())
    }
}
