use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::catalog::domain::StaticCatalog;
use crate::core::domain::StaticSettingsProvider;
use crate::core::library::QueueResult;
use crate::core::repository::RepositoryStore;
use crate::gateway::factory::create_publisher;
use crate::hold::domain::service::HoldServiceImpl;
use crate::hold::domain::HoldService;
use crate::hold::repository::memory_hold_repository::MemoryHoldRepository;
use crate::hold::repository::sled_hold_repository::SledHoldRepository;
use crate::hold::repository::HoldRepository;
use crate::scheduler::clock::SystemClock;
use crate::scheduler::timer::ExpiryScheduler;

pub async fn create_hold_repository(store: RepositoryStore,
                                    data_dir: &Path) -> QueueResult<Box<dyn HoldRepository>> {
    match store {
        RepositoryStore::Memory => {
            Ok(Box::new(MemoryHoldRepository::new()))
        }
        RepositoryStore::Sled => {
            Ok(Box::new(SledHoldRepository::open(data_dir)?))
        }
    }
}

// Wires the engine with default collaborators (allow-all catalog, static
// tenant settings) and starts the expiry dispatcher; callers embedding the
// engine construct HoldServiceImpl directly with their own adapters.
pub async fn create_hold_service(store: RepositoryStore,
                                 data_dir: &Path) -> QueueResult<Arc<dyn HoldService>> {
    let hold_repository = create_hold_repository(store, data_dir).await?;
    let publisher = create_publisher(store.gateway_publisher()).await;
    let (scheduler, fired_rx) = ExpiryScheduler::new();
    let service: Arc<dyn HoldService> = Arc::new(HoldServiceImpl::new(
        hold_repository,
        Box::new(StaticCatalog::allow_all()),
        Box::new(StaticSettingsProvider::new()),
        publisher,
        Arc::new(SystemClock),
        scheduler,
    ));
    spawn_expiry_dispatcher(service.clone(), fired_rx);
    Ok(service)
}

// routes fired pickup-window timers into the engine's expiry handler
pub fn spawn_expiry_dispatcher(service: Arc<dyn HoldService>,
                               mut fired_rx: mpsc::UnboundedReceiver<String>) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(hold_id) = fired_rx.recv().await {
            if let Err(err) = service.on_expiry(hold_id.as_str()).await {
                warn!("expiry handling failed for hold {}: {}", hold_id, err);
            }
        }
    })
}

// periodic durability backstop against lost timers
pub fn spawn_reconciler(service: Arc<dyn HoldService>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            match service.reconcile().await {
                Ok(0) => {}
                Ok(swept) => info!("reconciliation sweep forfeited {} overdue holds", swept),
                Err(err) => warn!("reconciliation sweep failed: {}", err),
            }
        }
    })
}
