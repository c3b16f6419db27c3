use async_trait::async_trait;
use crate::core::events::HoldEvent;
use crate::core::library::QueueError;

// EventPublisher hands "hold ready" / "hold forfeited" events to the
// notifier adapter; delivery mechanics stay outside the engine.
#[async_trait]
pub trait EventPublisher: Sync + Send {
    async fn publish(&self, event: &HoldEvent) -> Result<(), QueueError>;
}
