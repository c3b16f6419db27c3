pub mod memory_hold_repository;
pub mod sled_hold_repository;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use crate::core::library::QueueResult;
use crate::core::repository::Repository;
use crate::hold::domain::model::HoldEntity;

// HoldRepository is the hold-store contract. Beyond the base repository it
// exposes the atomic primitives the queue engine needs: per-tenant sequence
// allocation, compare-and-insert on the active (tenant, title, patron)
// triple (part of create), and the ordered/derived lookups. A naive
// read-then-write store cannot implement this contract safely.
#[async_trait]
pub trait HoldRepository: Repository<HoldEntity> {
    // allocates the next strictly increasing sequence for the tenant
    async fn next_sequence(&self, tenant_id: &str) -> QueueResult<i64>;

    // the Waiting hold with the smallest sequence for the title, if any
    async fn find_oldest_waiting(&self, tenant_id: &str, title_id: &str) -> QueueResult<Option<HoldEntity>>;

    // the single Ready hold for the title, if any
    async fn find_ready(&self, tenant_id: &str, title_id: &str) -> QueueResult<Option<HoldEntity>>;

    // the patron's Waiting or Ready hold for the title, if any
    async fn find_active_for_patron(&self, tenant_id: &str, title_id: &str,
                                    patron_id: &str) -> QueueResult<Option<HoldEntity>>;

    // how many Waiting holds for the title precede the given sequence
    async fn count_waiting_before(&self, tenant_id: &str, title_id: &str,
                                  sequence: i64) -> QueueResult<u64>;

    // Ready holds whose pickup window already lapsed; reconciliation feed
    async fn find_expired_ready(&self, now: NaiveDateTime) -> QueueResult<Vec<HoldEntity>>;
}
