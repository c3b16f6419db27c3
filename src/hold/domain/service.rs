use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info, warn};

use crate::catalog::domain::CatalogService;
use crate::core::domain::TenantSettingsProvider;
use crate::core::events::HoldEvent;
use crate::core::library::{CancelActor, HoldStatus, QueueError, QueueResult};
use crate::core::repository::{with_retry, DEFAULT_RETRY_ATTEMPTS};
use crate::gateway::events::EventPublisher;
use crate::hold::domain::model::HoldEntity;
use crate::hold::domain::HoldService;
use crate::hold::dto::HoldDto;
use crate::hold::repository::HoldRepository;
use crate::scheduler::clock::Clock;
use crate::scheduler::timer::ExpiryScheduler;

// TitleLocks keys a mutual-exclusion scope by (tenant_id, title_id) so two
// concurrent returns for the same title cannot both select the same oldest
// waiting hold, while unrelated titles never contend.
#[derive(Default)]
pub struct TitleLocks {
    locks: Mutex<HashMap<(String, String), Arc<tokio::sync::Mutex<()>>>>,
}

impl TitleLocks {
    pub fn new() -> Self {
        Self { locks: Mutex::new(HashMap::new()) }
    }

    pub async fn acquire(&self, tenant_id: &str, title_id: &str) -> OwnedMutexGuard<()> {
        let handle = {
            let mut locks = match self.locks.lock() {
                Ok(locks) => locks,
                Err(poisoned) => poisoned.into_inner(),
            };
            locks.entry((tenant_id.to_string(), title_id.to_string()))
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };
        handle.lock_owned().await
    }
}

pub struct HoldServiceImpl {
    hold_repository: Box<dyn HoldRepository>,
    catalog_service: Box<dyn CatalogService>,
    settings_provider: Box<dyn TenantSettingsProvider>,
    events_publisher: Box<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    scheduler: ExpiryScheduler,
    title_locks: TitleLocks,
}

impl HoldServiceImpl {
    pub fn new(hold_repository: Box<dyn HoldRepository>,
               catalog_service: Box<dyn CatalogService>,
               settings_provider: Box<dyn TenantSettingsProvider>,
               events_publisher: Box<dyn EventPublisher>,
               clock: Arc<dyn Clock>,
               scheduler: ExpiryScheduler) -> Self {
        Self {
            hold_repository,
            catalog_service,
            settings_provider,
            events_publisher,
            clock,
            scheduler,
            title_locks: TitleLocks::new(),
        }
    }

    // one locked enqueue attempt; the caller owns retries so the critical
    // section is released before any backoff sleep
    async fn enqueue_once(&self, tenant_id: &str, title_id: &str,
                          patron_id: &str) -> QueueResult<HoldDto> {
        let _guard = self.title_locks.acquire(tenant_id, title_id).await;
        if let Some(existing) = self.hold_repository
            .find_active_for_patron(tenant_id, title_id, patron_id).await? {
            return Err(QueueError::duplicate_hold(
                format!("patron {} already holds title {} via hold {}",
                        patron_id, title_id, existing.hold_id).as_str()));
        }
        let sequence = self.hold_repository.next_sequence(tenant_id).await?;
        let hold = HoldEntity::new(tenant_id, title_id, patron_id, sequence, self.clock.now());
        self.hold_repository.create(&hold).await?;
        let position = self.hold_repository
            .count_waiting_before(tenant_id, title_id, sequence).await? + 1;
        info!("hold {} enqueued for title {} at position {}", hold.hold_id, title_id, position);
        Ok(HoldDto::from(&hold).with_position(position))
    }

    // promotes the oldest Waiting hold for the title unless one is already
    // Ready; opens the pickup window, arms the timer and notifies
    async fn promote_next(&self, tenant_id: &str, title_id: &str) -> QueueResult<()> {
        let promoted = {
            let _guard = self.title_locks.acquire(tenant_id, title_id).await;
            if self.hold_repository.find_ready(tenant_id, title_id).await?.is_some() {
                // the single returned copy is already spoken for
                debug!("title {} already has a ready hold", title_id);
                return Ok(());
            }
            let oldest = self.hold_repository.find_oldest_waiting(tenant_id, title_id).await?;
            let mut hold = match oldest {
                Some(hold) => hold,
                // no waiting holds; the copy goes to general availability
                None => return Ok(()),
            };
            let settings = self.settings_provider.settings_for(tenant_id).await?;
            hold.promote(self.clock.now(), settings.pickup_window)?;
            self.hold_repository.update(&hold).await?;
            hold
        };
        // timer and notification stay outside the critical section
        if let Some(expires_at) = promoted.expires_at {
            let fire_in = (expires_at - self.clock.now()).to_std().unwrap_or_default();
            self.scheduler.schedule(promoted.hold_id.as_str(), fire_in);
            let event = HoldEvent::ready(promoted.hold_id.as_str(), tenant_id, title_id,
                                         promoted.patron_id.as_str(), expires_at);
            if let Err(err) = self.events_publisher.publish(&event).await {
                warn!("failed to publish ready event for hold {}: {}", promoted.hold_id, err);
            }
            info!("hold {} ready for pickup until {}", promoted.hold_id, expires_at);
        }
        Ok(())
    }

    // forfeits the hold when it is still Ready and its window lapsed;
    // returns None when the timer fire is a no-op
    async fn forfeit_once(&self, hold_id: &str) -> QueueResult<Option<HoldEntity>> {
        let probe = self.hold_repository.get(hold_id).await?;
        let _guard = self.title_locks
            .acquire(probe.tenant_id.as_str(), probe.title_id.as_str()).await;
        let mut hold = self.hold_repository.get(hold_id).await?;
        if hold.hold_status != HoldStatus::Ready {
            debug!("expiry fired for hold {} already {}", hold_id, hold.hold_status);
            return Ok(None);
        }
        let now = self.clock.now();
        match hold.expires_at {
            Some(expires_at) if now >= expires_at => {}
            _ => return Ok(None),
        }
        hold.forfeit(now)?;
        self.hold_repository.update(&hold).await?;
        info!("hold {} forfeited, pickup window elapsed", hold_id);
        Ok(Some(hold))
    }

    async fn fulfill_once(&self, hold_id: &str) -> QueueResult<HoldDto> {
        let probe = self.hold_repository.get(hold_id).await?;
        let _guard = self.title_locks
            .acquire(probe.tenant_id.as_str(), probe.title_id.as_str()).await;
        let mut hold = self.hold_repository.get(hold_id).await?;
        hold.fulfill(self.clock.now())?;
        self.hold_repository.update(&hold).await?;
        info!("hold {} fulfilled by patron {}", hold_id, hold.patron_id);
        Ok(HoldDto::from(&hold))
    }

    async fn cancel_once(&self, hold_id: &str,
                         actor: CancelActor) -> QueueResult<(HoldEntity, bool)> {
        let probe = self.hold_repository.get(hold_id).await?;
        let _guard = self.title_locks
            .acquire(probe.tenant_id.as_str(), probe.title_id.as_str()).await;
        let mut hold = self.hold_repository.get(hold_id).await?;
        let was_ready = hold.hold_status == HoldStatus::Ready;
        hold.cancel(actor, self.clock.now())?;
        self.hold_repository.update(&hold).await?;
        info!("hold {} cancelled by {}", hold_id, actor);
        Ok((hold, was_ready))
    }
}

#[async_trait]
impl HoldService for HoldServiceImpl {
    async fn enqueue(&self, tenant_id: &str, title_id: &str,
                     patron_id: &str) -> QueueResult<HoldDto> {
        if !self.catalog_service.title_supports_holds(tenant_id, title_id).await? {
            return Err(QueueError::title_not_eligible(
                format!("title {} does not support holds", title_id).as_str()));
        }
        with_retry(DEFAULT_RETRY_ATTEMPTS,
                   || self.enqueue_once(tenant_id, title_id, patron_id)).await
    }

    async fn fulfill(&self, hold_id: &str) -> QueueResult<HoldDto> {
        let dto = with_retry(DEFAULT_RETRY_ATTEMPTS, || self.fulfill_once(hold_id)).await?;
        // a failed abort only means the timer already fired; the expiry
        // handler's status check makes that harmless
        self.scheduler.cancel(hold_id);
        Ok(dto)
    }

    async fn cancel(&self, hold_id: &str, actor: CancelActor) -> QueueResult<HoldDto> {
        let (hold, was_ready) = with_retry(DEFAULT_RETRY_ATTEMPTS,
                                           || self.cancel_once(hold_id, actor)).await?;
        if was_ready {
            self.scheduler.cancel(hold_id);
            // the copy this hold was holding frees up for the next patron
            self.on_copy_returned(hold.tenant_id.as_str(), hold.title_id.as_str()).await?;
        }
        Ok(HoldDto::from(&hold))
    }

    async fn position_of(&self, hold_id: &str) -> QueueResult<Option<u64>> {
        let hold = self.hold_repository.get(hold_id).await?;
        if hold.hold_status != HoldStatus::Waiting {
            return Ok(None);
        }
        let before = self.hold_repository
            .count_waiting_before(hold.tenant_id.as_str(), hold.title_id.as_str(),
                                  hold.sequence).await?;
        Ok(Some(before + 1))
    }

    async fn queue_for_title(&self, tenant_id: &str, title_id: &str) -> QueueResult<Vec<HoldDto>> {
        let predicate = HashMap::from([
            ("tenant_id".to_string(), tenant_id.to_string()),
            ("title_id".to_string(), title_id.to_string()),
            ("hold_status".to_string(), HoldStatus::Waiting.to_string()),
        ]);
        let res = self.hold_repository.query(&predicate, None, 500).await?;
        Ok(res.records.iter().enumerate()
            .map(|(ndx, entity)| HoldDto::from(entity).with_position(ndx as u64 + 1))
            .collect())
    }

    async fn on_copy_returned(&self, tenant_id: &str, title_id: &str) -> QueueResult<()> {
        with_retry(DEFAULT_RETRY_ATTEMPTS, || self.promote_next(tenant_id, title_id)).await
    }

    async fn on_expiry(&self, hold_id: &str) -> QueueResult<()> {
        let forfeited = with_retry(DEFAULT_RETRY_ATTEMPTS, || self.forfeit_once(hold_id)).await?;
        let hold = match forfeited {
            Some(hold) => hold,
            None => return Ok(()),
        };
        self.scheduler.cancel(hold_id);
        let reason = hold.cancel_reason.clone().unwrap_or_default();
        let event = HoldEvent::forfeited(hold.hold_id.as_str(), hold.tenant_id.as_str(),
                                         hold.title_id.as_str(), hold.patron_id.as_str(),
                                         reason.as_str());
        if let Err(err) = self.events_publisher.publish(&event).await {
            warn!("failed to publish forfeited event for hold {}: {}", hold.hold_id, err);
        }
        // the forfeited copy becomes available again; promote the next patron
        self.on_copy_returned(hold.tenant_id.as_str(), hold.title_id.as_str()).await
    }

    async fn reconcile(&self) -> QueueResult<usize> {
        let overdue = self.hold_repository.find_expired_ready(self.clock.now()).await?;
        let mut swept = 0;
        for hold in overdue {
            match self.on_expiry(hold.hold_id.as_str()).await {
                Ok(()) => swept += 1,
                Err(err) => warn!("reconciliation failed for hold {}: {}", hold.hold_id, err),
            }
        }
        Ok(swept)
    }
}
