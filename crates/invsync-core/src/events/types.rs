//! Event types published on the inventory event bus.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::id::ResourceId;
use crate::kind::ResourceKind;
use crate::scope::EnumerationKey;

// ============================================================================
// Inventory Events
// ============================================================================

/// Type of local inventory change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InventoryEventType {
    Created,
    Updated,
    Deleted,
    Retired,
}

impl InventoryEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InventoryEventType::Created => "created",
            InventoryEventType::Updated => "updated",
            InventoryEventType::Deleted => "deleted",
            InventoryEventType::Retired => "retired",
        }
    }
}

impl std::fmt::Display for InventoryEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A change applied to one local inventory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryEvent {
    pub event_type: InventoryEventType,
    pub kind: ResourceKind,
    pub resource_id: ResourceId,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl InventoryEvent {
    pub fn new(event_type: InventoryEventType, kind: ResourceKind, resource_id: ResourceId) -> Self {
        Self {
            event_type,
            kind,
            resource_id,
            timestamp: OffsetDateTime::now_utc(),
        }
    }

    pub fn created(kind: ResourceKind, resource_id: ResourceId) -> Self {
        Self::new(InventoryEventType::Created, kind, resource_id)
    }

    pub fn updated(kind: ResourceKind, resource_id: ResourceId) -> Self {
        Self::new(InventoryEventType::Updated, kind, resource_id)
    }

    pub fn deleted(kind: ResourceKind, resource_id: ResourceId) -> Self {
        Self::new(InventoryEventType::Deleted, kind, resource_id)
    }

    pub fn retired(kind: ResourceKind, resource_id: ResourceId) -> Self {
        Self::new(InventoryEventType::Retired, kind, resource_id)
    }
}

// ============================================================================
// Cycle Events
// ============================================================================

/// How an enumeration cycle ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome", content = "message")]
pub enum CycleOutcomeKind {
    Finished,
    Stopped,
    Failed(String),
}

/// Published once per cycle on its terminal stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleEvent {
    pub key: EnumerationKey,
    pub outcome: CycleOutcomeKind,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl CycleEvent {
    pub fn new(key: EnumerationKey, outcome: CycleOutcomeKind) -> Self {
        Self {
            key,
            outcome,
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}

// ============================================================================
// System Event
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum SystemEvent {
    Inventory(InventoryEvent),
    Cycle(CycleEvent),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope::ScopeRef;

    #[test]
    fn test_inventory_event_constructors() {
        let id = ResourceId::new("VM-1").unwrap();
        let event = InventoryEvent::retired(ResourceKind::VirtualMachine, id.clone());
        assert_eq!(event.event_type, InventoryEventType::Retired);
        assert_eq!(event.resource_id, id);
        assert_eq!(event.event_type.to_string(), "retired");
    }

    #[test]
    fn test_cycle_event_serialization() {
        let key = EnumerationKey::new(ScopeRef::new("t", "sub").unwrap(), "disks");
        let event = SystemEvent::Cycle(CycleEvent::new(
            key,
            CycleOutcomeKind::Failed("listing failed".to_string()),
        ));
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["category"], "cycle");
        assert_eq!(json["outcome"]["outcome"], "failed");
        assert_eq!(json["outcome"]["message"], "listing failed");
    }
}
