use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Inventory resource kinds tracked by the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResourceKind {
    VirtualMachine,
    Disk,
    Network,
    NetworkInterface,
    StorageAccount,
    SecurityGroup,
    ResourceGroup,
}

impl ResourceKind {
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::VirtualMachine,
        ResourceKind::Disk,
        ResourceKind::Network,
        ResourceKind::NetworkInterface,
        ResourceKind::StorageAccount,
        ResourceKind::SecurityGroup,
        ResourceKind::ResourceGroup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::VirtualMachine => "virtual-machine",
            ResourceKind::Disk => "disk",
            ResourceKind::Network => "network",
            ResourceKind::NetworkInterface => "network-interface",
            ResourceKind::StorageAccount => "storage-account",
            ResourceKind::SecurityGroup => "security-group",
            ResourceKind::ResourceGroup => "resource-group",
        }
    }

    /// Whether records of this kind carry a power state.
    pub fn has_power_state(&self) -> bool {
        matches!(self, ResourceKind::VirtualMachine)
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::invalid_resource_kind(s))
    }
}
