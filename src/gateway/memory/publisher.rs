use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::core::events::HoldEvent;
use crate::core::library::QueueError;
use crate::gateway::events::EventPublisher;

// MemoryPublisher fans events out to in-process subscribers and keeps a
// record of everything published; tests use it as the notifier spy.
#[derive(Clone)]
pub struct MemoryPublisher {
    events_tx: broadcast::Sender<HoldEvent>,
    published: Arc<Mutex<Vec<HoldEvent>>>,
}

impl MemoryPublisher {
    pub fn new() -> Self {
        let (events_tx, _) = broadcast::channel(256);
        Self {
            events_tx,
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<HoldEvent> {
        self.events_tx.subscribe()
    }

    pub fn published(&self) -> Vec<HoldEvent> {
        match self.published.lock() {
            Ok(published) => published.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Default for MemoryPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for MemoryPublisher {
    async fn publish(&self, event: &HoldEvent) -> Result<(), QueueError> {
        if let Ok(mut published) = self.published.lock() {
            published.push(event.clone());
        }
        // a send error only means nobody subscribed yet
        let _ = self.events_tx.send(event.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use crate::core::events::{HoldEvent, HoldEventKind};
    use crate::gateway::events::EventPublisher;
    use crate::gateway::memory::publisher::MemoryPublisher;

    #[tokio::test]
    async fn test_should_record_published_events() {
        let publisher = MemoryPublisher::new();
        let event = HoldEvent::ready("hold1", "tenant1", "title1", "patron1", Utc::now().naive_utc());
        publisher.publish(&event).await.expect("should publish");
        let published = publisher.published();
        assert_eq!(1, published.len());
        assert_eq!(HoldEventKind::Ready, published[0].kind);
    }

    #[tokio::test]
    async fn test_should_broadcast_to_subscriber() {
        let publisher = MemoryPublisher::new();
        let mut events_rx = publisher.subscribe();
        let event = HoldEvent::forfeited("hold1", "tenant1", "title1", "patron1", "pickup window elapsed");
        publisher.publish(&event).await.expect("should publish");
        let received = events_rx.recv().await.expect("should receive event");
        assert_eq!(event.event_id, received.event_id);
    }
}
