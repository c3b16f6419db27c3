use std::path::Path;
use std::time::Duration;

use tracing::info;

use holdq::core::library::{CancelActor, QueueError};
use holdq::core::repository::RepositoryStore;
use holdq::hold::factory::{create_hold_service, spawn_reconciler};
use holdq::utils::trace::setup_tracing;

// Walks the hold queue through its lifecycle against the in-memory store:
// two patrons queue for the same title, a copy return promotes the first,
// the first patron picks it up and the second cancels.
#[tokio::main]
async fn main() -> Result<(), QueueError> {
    setup_tracing();

    let service = create_hold_service(RepositoryStore::Memory, Path::new("unused")).await?;
    let _reconciler = spawn_reconciler(service.clone(), Duration::from_secs(60));

    let first = service.enqueue("main-library", "moby-dick", "patron-1").await?;
    let second = service.enqueue("main-library", "moby-dick", "patron-2").await?;
    info!("queued {:?} and {:?}", first.position, second.position);

    service.on_copy_returned("main-library", "moby-dick").await?;
    info!("first patron position after return: {:?}",
          service.position_of(first.hold_id.as_str()).await?);
    info!("second patron position after return: {:?}",
          service.position_of(second.hold_id.as_str()).await?);

    let fulfilled = service.fulfill(first.hold_id.as_str()).await?;
    info!("hold {} is {}", fulfilled.hold_id, fulfilled.hold_status);

    let cancelled = service.cancel(second.hold_id.as_str(), CancelActor::Patron).await?;
    info!("hold {} is {}", cancelled.hold_id, cancelled.hold_status);

    Ok(())
}
