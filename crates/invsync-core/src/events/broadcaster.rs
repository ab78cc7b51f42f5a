//! Event broadcaster backed by a tokio broadcast channel.

use std::sync::Arc;
use tokio::sync::broadcast;

use super::types::{CycleEvent, InventoryEvent, SystemEvent};

/// Events beyond this limit are dropped for slow receivers.
const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Cloneable multi-subscriber event bus.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<SystemEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_BUFFER_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Sends an event to all subscribers.
    ///
    /// Returns the number of subscribers that received it (0 when nobody listens).
    pub fn send(&self, event: SystemEvent) -> usize {
        self.sender.send(event).unwrap_or_default()
    }

    pub fn send_inventory(&self, event: InventoryEvent) -> usize {
        self.send(SystemEvent::Inventory(event))
    }

    pub fn send_cycle(&self, event: CycleEvent) -> usize {
        self.send(SystemEvent::Cycle(event))
    }

    /// Events sent before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<SystemEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::id::ResourceId;
    use crate::kind::ResourceKind;

    #[test]
    fn test_broadcaster_no_subscribers() {
        let broadcaster = EventBroadcaster::new();
        assert!(!broadcaster.has_subscribers());
        let count = broadcaster.send_inventory(InventoryEvent::created(
            ResourceKind::Disk,
            ResourceId::new("d-1").unwrap(),
        ));
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_broadcaster_send_receive() {
        let broadcaster = EventBroadcaster::new();
        let mut receiver = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 1);

        broadcaster.send_inventory(InventoryEvent::deleted(
            ResourceKind::Disk,
            ResourceId::new("D-1").unwrap(),
        ));

        match receiver.recv().await.unwrap() {
            SystemEvent::Inventory(event) => {
                assert_eq!(event.kind, ResourceKind::Disk);
                assert_eq!(event.resource_id.as_str(), "d-1");
            }
            other => panic!("expected inventory event, got {other:?}"),
        }
    }
}
