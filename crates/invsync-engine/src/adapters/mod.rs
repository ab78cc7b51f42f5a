//! Built-in resource-kind adapters and the name lookup used by the controller.

mod compute;
mod network_interface;
mod plain;
mod security_group;

use std::collections::BTreeMap;
use std::sync::Arc;

pub use compute::VirtualMachineAdapter;
pub use network_interface::{NetworkInterfaceAdapter, PUBLIC_ADDRESS_ID};
pub use plain::PlainAdapter;
pub use security_group::SecurityGroupAdapter;

use crate::adapter::ResourceAdapter;
use crate::error::EngineError;

/// Adapters addressable by name.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<&'static str, Arc<dyn ResourceAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every built-in adapter.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(VirtualMachineAdapter::new()));
        registry.register(Arc::new(PlainAdapter::disks()));
        registry.register(Arc::new(PlainAdapter::networks()));
        registry.register(Arc::new(NetworkInterfaceAdapter));
        registry.register(Arc::new(PlainAdapter::storage_accounts()));
        registry.register(Arc::new(PlainAdapter::resource_groups()));
        registry.register(Arc::new(SecurityGroupAdapter));
        registry
    }

    /// Adds an adapter, replacing any adapter with the same name.
    pub fn register(&mut self, adapter: Arc<dyn ResourceAdapter>) {
        self.adapters.insert(adapter.name(), adapter);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn ResourceAdapter>, EngineError> {
        self.adapters
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UnknownAdapter(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.adapters.keys().copied()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.adapters.keys()).finish()
    }
}
