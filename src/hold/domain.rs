use async_trait::async_trait;
use crate::core::library::{CancelActor, QueueResult};
use crate::hold::dto::HoldDto;

pub mod model;
pub mod service;

// HoldService is the queue engine: four caller-facing operations plus the
// two inbound triggers (copy return, expiry timer) and the reconciliation
// sweep that backstops lost timers.
#[async_trait]
pub trait HoldService: Sync + Send {
    // places a Waiting hold; fails DuplicateHold / TitleNotEligible
    async fn enqueue(&self, tenant_id: &str, title_id: &str, patron_id: &str) -> QueueResult<HoldDto>;

    // patron picks up the copy within the window; fails HoldNotReady / HoldExpired
    async fn fulfill(&self, hold_id: &str) -> QueueResult<HoldDto>;

    // patron or staff cancels a Waiting or Ready hold
    async fn cancel(&self, hold_id: &str, actor: CancelActor) -> QueueResult<HoldDto>;

    // 1-based rank among Waiting holds for the title; None unless Waiting
    async fn position_of(&self, hold_id: &str) -> QueueResult<Option<u64>>;

    // the Waiting queue for a title in promotion order, positions attached
    async fn queue_for_title(&self, tenant_id: &str, title_id: &str) -> QueueResult<Vec<HoldDto>>;

    // catalog adapter callback: a loaned copy became available
    async fn on_copy_returned(&self, tenant_id: &str, title_id: &str) -> QueueResult<()>;

    // timer callback: the pickup window for the hold may have lapsed
    async fn on_expiry(&self, hold_id: &str) -> QueueResult<()>;

    // sweeps Ready holds past their window; returns how many were processed
    async fn reconcile(&self) -> QueueResult<usize>;
}
