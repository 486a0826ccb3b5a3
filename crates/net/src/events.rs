//! In-process event bus
//!
//! Handlers publish [`DomainEvent`]s after a successful write; anything
//! interested (the app's event logger, future push channels) subscribes.
//! Subscribers that fall behind lose the oldest events.

use playzone_core::DomainEvent;
use tokio::sync::broadcast;
use tracing::trace;

/// Events buffered per subscriber before lagging
const EVENT_CAPACITY: usize = 256;

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<DomainEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    /// Publish to current subscribers. Returns how many received it.
    pub fn publish(&self, event: DomainEvent) -> usize {
        let name = event.name();
        // No subscribers is not an error
        let delivered = self.tx.send(event).unwrap_or(0);
        trace!(event = name, delivered, "Event published");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.tx.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_subscriber_receives_events() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();
        let center_id = Uuid::new_v4();

        assert_eq!(bus.publish(DomainEvent::CentersUpdated { center_id }), 1);
        assert_eq!(
            rx.recv().await.unwrap(),
            DomainEvent::CentersUpdated { center_id }
        );
    }

    #[test]
    fn test_publish_without_subscribers() {
        let bus = EventBus::new();
        let delivered = bus.publish(DomainEvent::AdminChanged {
            user_id: Uuid::new_v4(),
        });
        assert_eq!(delivered, 0);
    }
}
