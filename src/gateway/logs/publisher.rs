use async_trait::async_trait;
use tracing::info;

use crate::core::events::HoldEvent;
use crate::core::library::QueueError;
use crate::gateway::events::EventPublisher;

// LogPublisher writes events as structured log lines; useful when the
// notifier adapter tails the log stream or no broker is wired up.
#[derive(Debug, Default)]
pub struct LogPublisher;

impl LogPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for LogPublisher {
    async fn publish(&self, event: &HoldEvent) -> Result<(), QueueError> {
        let json = serde_json::to_string(event)?;
        info!(event = json.as_str(), "hold event published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use crate::core::events::HoldEvent;
    use crate::gateway::events::EventPublisher;
    use crate::gateway::logs::publisher::LogPublisher;

    #[tokio::test]
    async fn test_should_publish_to_logs() {
        let publisher = LogPublisher::new();
        let event = HoldEvent::ready("hold1", "tenant1", "title1", "patron1", Utc::now().naive_utc());
        publisher.publish(&event).await.expect("should publish");
    }
}
