use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use tokio::sync::RwLock;

use crate::core::library::{HoldStatus, PaginatedResult, QueueError, QueueResult};
use crate::core::repository::Repository;
use crate::hold::domain::model::HoldEntity;
use crate::hold::repository::HoldRepository;

// In-memory hold store for tests and degraded mode. A single RwLock over the
// record map makes create/update atomic read-modify-write, matching the
// compare-and-insert and version-CAS contract of the durable store.
#[derive(Debug, Default)]
pub struct MemoryHoldRepository {
    holds: RwLock<HashMap<String, HoldEntity>>,
    sequences: RwLock<HashMap<String, i64>>,
}

impl MemoryHoldRepository {
    pub fn new() -> Self {
        Self {
            holds: RwLock::new(HashMap::new()),
            sequences: RwLock::new(HashMap::new()),
        }
    }

    fn matches(entity: &HoldEntity, predicate: &HashMap<String, String>) -> bool {
        for (key, value) in predicate {
            let matched = match key.as_str() {
                "tenant_id" => entity.tenant_id == *value,
                "title_id" => entity.title_id == *value,
                "patron_id" => entity.patron_id == *value,
                "hold_status" => entity.hold_status.to_string() == *value,
                _ => false,
            };
            if !matched {
                return false;
            }
        }
        true
    }
}

#[async_trait]
impl Repository<HoldEntity> for MemoryHoldRepository {
    async fn create(&self, entity: &HoldEntity) -> QueueResult<usize> {
        let mut holds = self.holds.write().await;
        if holds.contains_key(entity.hold_id.as_str()) {
            return Err(QueueError::duplicate_hold(
                format!("hold {} already exists", entity.hold_id).as_str()));
        }
        let duplicate = holds.values().any(|existing| {
            existing.is_active()
                && existing.tenant_id == entity.tenant_id
                && existing.title_id == entity.title_id
                && existing.patron_id == entity.patron_id
        });
        if duplicate {
            return Err(QueueError::duplicate_hold(
                format!("patron {} already holds title {} for tenant {}",
                        entity.patron_id, entity.title_id, entity.tenant_id).as_str()));
        }
        holds.insert(entity.hold_id.to_string(), entity.clone());
        Ok(1)
    }

    async fn update(&self, entity: &HoldEntity) -> QueueResult<usize> {
        let mut holds = self.holds.write().await;
        let current = holds.get(entity.hold_id.as_str()).ok_or_else(|| {
            QueueError::not_found(format!("hold not found for {}", entity.hold_id).as_str())
        })?;
        if current.version != entity.version {
            // stale read; the caller re-reads and retries
            return Err(QueueError::store_unavailable(
                format!("version conflict on hold {}: {} != {}",
                        entity.hold_id, current.version, entity.version).as_str(),
                None, true));
        }
        let mut updated = entity.clone();
        updated.version = entity.version + 1;
        holds.insert(updated.hold_id.to_string(), updated);
        Ok(1)
    }

    async fn get(&self, id: &str) -> QueueResult<HoldEntity> {
        let holds = self.holds.read().await;
        holds.get(id).cloned().ok_or_else(|| {
            QueueError::not_found(format!("hold not found for {}", id).as_str())
        })
    }

    async fn query(&self, predicate: &HashMap<String, String>,
                   page: Option<&str>, page_size: usize) -> QueueResult<PaginatedResult<HoldEntity>> {
        let offset = match page {
            Some(token) => token.parse::<usize>().map_err(|_| {
                QueueError::runtime(format!("invalid page token {}", token).as_str(), None)
            })?,
            None => 0,
        };
        let holds = self.holds.read().await;
        let mut records: Vec<HoldEntity> = holds.values()
            .filter(|entity| Self::matches(entity, predicate))
            .cloned()
            .collect();
        records.sort_by_key(|entity| entity.sequence);
        let next_page = if offset + page_size < records.len() {
            Some((offset + page_size).to_string())
        } else {
            None
        };
        let records = records.into_iter().skip(offset).take(page_size).collect();
        Ok(PaginatedResult::new(page, page_size, next_page, records))
    }
}

#[async_trait]
impl HoldRepository for MemoryHoldRepository {
    async fn next_sequence(&self, tenant_id: &str) -> QueueResult<i64> {
        let mut sequences = self.sequences.write().await;
        let next = sequences.get(tenant_id).copied().unwrap_or(0) + 1;
        sequences.insert(tenant_id.to_string(), next);
        Ok(next)
    }

    async fn find_oldest_waiting(&self, tenant_id: &str, title_id: &str) -> QueueResult<Option<HoldEntity>> {
        let holds = self.holds.read().await;
        Ok(holds.values()
            .filter(|entity| entity.tenant_id == tenant_id
                && entity.title_id == title_id
                && entity.hold_status == HoldStatus::Waiting)
            .min_by_key(|entity| entity.sequence)
            .cloned())
    }

    async fn find_ready(&self, tenant_id: &str, title_id: &str) -> QueueResult<Option<HoldEntity>> {
        let holds = self.holds.read().await;
        Ok(holds.values()
            .find(|entity| entity.tenant_id == tenant_id
                && entity.title_id == title_id
                && entity.hold_status == HoldStatus::Ready)
            .cloned())
    }

    async fn find_active_for_patron(&self, tenant_id: &str, title_id: &str,
                                    patron_id: &str) -> QueueResult<Option<HoldEntity>> {
        let holds = self.holds.read().await;
        Ok(holds.values()
            .find(|entity| entity.is_active()
                && entity.tenant_id == tenant_id
                && entity.title_id == title_id
                && entity.patron_id == patron_id)
            .cloned())
    }

    async fn count_waiting_before(&self, tenant_id: &str, title_id: &str,
                                  sequence: i64) -> QueueResult<u64> {
        let holds = self.holds.read().await;
        Ok(holds.values()
            .filter(|entity| entity.tenant_id == tenant_id
                && entity.title_id == title_id
                && entity.hold_status == HoldStatus::Waiting
                && entity.sequence < sequence)
            .count() as u64)
    }

    async fn find_expired_ready(&self, now: NaiveDateTime) -> QueueResult<Vec<HoldEntity>> {
        let holds = self.holds.read().await;
        let mut expired: Vec<HoldEntity> = holds.values()
            .filter(|entity| entity.hold_status == HoldStatus::Ready
                && entity.expires_at.map(|at| now >= at).unwrap_or(false))
            .cloned()
            .collect();
        expired.sort_by_key(|entity| entity.sequence);
        Ok(expired)
    }
}
