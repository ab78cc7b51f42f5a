//! In-flight enumeration registry.
//!
//! Holds one entry per running cycle. Registration is an atomic
//! insert-if-absent, so two concurrent START requests for the same key can
//! never both win.

use std::fmt;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use invsync_core::{EnumerationKey, generate_token};

/// Ownership token handed to the cycle that registered a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CycleToken(String);

impl CycleToken {
    fn generate() -> Self {
        Self(generate_token())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CycleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct InFlightRegistry {
    active: DashMap<EnumerationKey, CycleToken>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `key` if no cycle holds it. Returns `None` when already running.
    pub fn try_register(&self, key: &EnumerationKey) -> Option<CycleToken> {
        match self.active.entry(key.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                let token = CycleToken::generate();
                slot.insert(token.clone());
                Some(token)
            }
        }
    }

    /// Whether `key` is still held by the cycle owning `token`.
    pub fn is_active(&self, key: &EnumerationKey, token: &CycleToken) -> bool {
        self.active
            .get(key)
            .is_some_and(|current| current.value() == token)
    }

    pub fn is_running(&self, key: &EnumerationKey) -> bool {
        self.active.contains_key(key)
    }

    /// Removes `key` only if it is still owned by `token`.
    pub fn unregister(&self, key: &EnumerationKey, token: &CycleToken) -> bool {
        self.active
            .remove_if(key, |_, current| current == token)
            .is_some()
    }

    /// Removes `key` regardless of owner. Idempotent.
    pub fn stop(&self, key: &EnumerationKey) -> bool {
        self.active.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    pub fn active_keys(&self) -> Vec<EnumerationKey> {
        self.active.iter().map(|entry| entry.key().clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use invsync_core::ScopeRef;
    use std::sync::Arc;

    fn key(adapter: &str) -> EnumerationKey {
        EnumerationKey::new(ScopeRef::new("t", "sub").unwrap(), adapter)
    }

    #[test]
    fn test_register_is_single_flight() {
        let registry = InFlightRegistry::new();
        let token = registry.try_register(&key("disks")).unwrap();
        assert!(registry.try_register(&key("disks")).is_none());
        assert!(registry.try_register(&key("networks")).is_some());
        assert!(registry.is_active(&key("disks"), &token));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unregister_requires_owner() {
        let registry = InFlightRegistry::new();
        let old = registry.try_register(&key("disks")).unwrap();

        assert!(registry.stop(&key("disks")));
        assert!(!registry.stop(&key("disks")));

        let fresh = registry.try_register(&key("disks")).unwrap();
        assert!(!registry.unregister(&key("disks"), &old));
        assert!(registry.is_active(&key("disks"), &fresh));
        assert!(!registry.is_active(&key("disks"), &old));

        assert!(registry.unregister(&key("disks"), &fresh));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_registration_has_one_winner() {
        let registry = Arc::new(InFlightRegistry::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || registry.try_register(&key("vms")).is_some())
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
