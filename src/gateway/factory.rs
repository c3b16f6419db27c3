use crate::gateway::events::EventPublisher;
use crate::gateway::logs::publisher::LogPublisher;
use crate::gateway::memory::publisher::MemoryPublisher;
use crate::gateway::GatewayPublisherVia;

pub async fn create_publisher(via: GatewayPublisherVia) -> Box<dyn EventPublisher> {
    match via {
        GatewayPublisherVia::Memory => {
            Box::new(MemoryPublisher::new())
        }
        GatewayPublisherVia::Logs => {
            Box::new(LogPublisher::new())
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::gateway::factory::create_publisher;
    use crate::gateway::GatewayPublisherVia;

    #[tokio::test]
    async fn test_should_create_publishers() {
        let _ = create_publisher(GatewayPublisherVia::Memory).await;
        let _ = create_publisher(GatewayPublisherVia::Logs).await;
    }
}
