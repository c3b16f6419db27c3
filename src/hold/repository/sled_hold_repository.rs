use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use sled::transaction::{ConflictableTransactionError, TransactionError};
use sled::Transactional;

use crate::core::library::{HoldStatus, PaginatedResult, QueueError, QueueResult};
use crate::core::repository::Repository;
use crate::hold::domain::model::HoldEntity;
use crate::hold::repository::HoldRepository;

const HOLDS_TREE: &str = "holds";
const ACTIVE_TREE: &str = "active_holds";
const SEQUENCES_TREE: &str = "tenant_sequences";

// Durable hold store on sled. Records are JSON documents keyed by hold id;
// a second tree indexes the active (tenant, title, patron) triple so create
// is a transactional compare-and-insert, and a third tree holds per-tenant
// sequence counters. Updates compare-and-swap on the record version.
pub struct SledHoldRepository {
    holds: sled::Tree,
    active: sled::Tree,
    sequences: sled::Tree,
}

impl SledHoldRepository {
    pub fn open(path: &Path) -> QueueResult<Self> {
        let db = sled::open(path)?;
        Ok(Self {
            holds: db.open_tree(HOLDS_TREE)?,
            active: db.open_tree(ACTIVE_TREE)?,
            sequences: db.open_tree(SEQUENCES_TREE)?,
        })
    }

    fn active_key(tenant_id: &str, title_id: &str, patron_id: &str) -> Vec<u8> {
        format!("{}\u{0}{}\u{0}{}", tenant_id, title_id, patron_id).into_bytes()
    }

    fn parse_sequence(bytes: &[u8]) -> i64 {
        match bytes.try_into() {
            Ok(arr) => i64::from_be_bytes(arr),
            Err(_) => 0,
        }
    }

    // full scan with a predicate; hold volumes per store are modest and the
    // per-title queues are what the engine serializes on
    fn scan<F>(&self, mut keep: F) -> QueueResult<Vec<HoldEntity>>
        where F: FnMut(&HoldEntity) -> bool {
        let mut records = Vec::new();
        for item in self.holds.iter() {
            let (_, value) = item?;
            let entity: HoldEntity = serde_json::from_slice(&value)?;
            if keep(&entity) {
                records.push(entity);
            }
        }
        Ok(records)
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

impl From<sled::Error> for QueueError {
    fn from(err: sled::Error) -> Self {
        let retryable = matches!(err, sled::Error::Io(_));
        QueueError::store_unavailable(format!("sled {:?}", err).as_str(), None, retryable)
    }
}

impl From<TransactionError<QueueError>> for QueueError {
    fn from(err: TransactionError<QueueError>) -> Self {
        match err {
            TransactionError::Abort(inner) => inner,
            TransactionError::Storage(storage) => QueueError::from(storage),
        }
    }
}

#[async_trait]
impl Repository<HoldEntity> for SledHoldRepository {
    async fn create(&self, entity: &HoldEntity) -> QueueResult<usize> {
        let id = entity.hold_id.as_bytes().to_vec();
        let triple_key = Self::active_key(entity.tenant_id.as_str(),
                                          entity.title_id.as_str(),
                                          entity.patron_id.as_str());
        let json = serde_json::to_vec(entity)?;
        let duplicate_id = format!("hold {} already exists", entity.hold_id);
        let duplicate_active = format!("patron {} already holds title {} for tenant {}",
                                       entity.patron_id, entity.title_id, entity.tenant_id);

        (&self.holds, &self.active).transaction(|(holds, active)| {
            if holds.get(id.as_slice())?.is_some() {
                return Err(ConflictableTransactionError::Abort(
                    QueueError::duplicate_hold(duplicate_id.as_str())));
            }
            if active.get(triple_key.as_slice())?.is_some() {
                return Err(ConflictableTransactionError::Abort(
                    QueueError::duplicate_hold(duplicate_active.as_str())));
            }
            holds.insert(id.clone(), json.clone())?;
            active.insert(triple_key.clone(), id.clone())?;
            Ok(())
        }).map_err(QueueError::from)?;
        Ok(1)
    }

    async fn update(&self, entity: &HoldEntity) -> QueueResult<usize> {
        let id = entity.hold_id.as_bytes().to_vec();
        let triple_key = Self::active_key(entity.tenant_id.as_str(),
                                          entity.title_id.as_str(),
                                          entity.patron_id.as_str());
        let mut updated = entity.clone();
        updated.version = entity.version + 1;
        let json = serde_json::to_vec(&updated)?;
        let expected_version = entity.version;
        let keep_active = updated.is_active();
        let not_found = format!("hold not found for {}", entity.hold_id);

        (&self.holds, &self.active).transaction(|(holds, active)| {
            let current = holds.get(id.as_slice())?.ok_or_else(|| {
                ConflictableTransactionError::Abort(QueueError::not_found(not_found.as_str()))
            })?;
            let current: HoldEntity = serde_json::from_slice(&current)
                .map_err(|err| ConflictableTransactionError::Abort(QueueError::from(err)))?;
            if current.version != expected_version {
                return Err(ConflictableTransactionError::Abort(QueueError::store_unavailable(
                    format!("version conflict on hold {}: {} != {}",
                            current.hold_id, current.version, expected_version).as_str(),
                    None, true)));
            }
            holds.insert(id.clone(), json.clone())?;
            if keep_active {
                active.insert(triple_key.clone(), id.clone())?;
            } else if let Some(owner) = active.get(triple_key.as_slice())? {
                // only drop the index entry while this hold still owns it
                if owner.as_ref() == id.as_slice() {
                    active.remove(triple_key.clone())?;
                }
            }
            Ok(())
        }).map_err(QueueError::from)?;
        Ok(1)
    }

    async fn get(&self, id: &str) -> QueueResult<HoldEntity> {
        match self.holds.get(id.as_bytes())? {
            Some(value) => Ok(serde_json::from_slice(&value)?),
            None => Err(QueueError::not_found(format!("hold not found for {}", id).as_str())),
        }
    }

    async fn query(&self, predicate: &HashMap<String, String>,
                   page: Option<&str>, page_size: usize) -> QueueResult<PaginatedResult<HoldEntity>> {
        let offset = match page {
            Some(token) => token.parse::<usize>().map_err(|_| {
                QueueError::runtime(format!("invalid page token {}", token).as_str(), None)
            })?,
            None => 0,
        };
        let mut records = self.scan(|entity| Self::matches(entity, predicate))?;
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
impl HoldRepository for SledHoldRepository {
    async fn next_sequence(&self, tenant_id: &str) -> QueueResult<i64> {
        let next = self.sequences.update_and_fetch(tenant_id.as_bytes(), |old| {
            let next = match old {
                Some(bytes) => Self::parse_sequence(bytes) + 1,
                None => 1,
            };
            Some(next.to_be_bytes().to_vec())
        })?;
        match next {
            Some(bytes) => Ok(Self::parse_sequence(&bytes)),
            None => Err(QueueError::runtime(
                format!("sequence missing for tenant {}", tenant_id).as_str(), None)),
        }
    }

    async fn find_oldest_waiting(&self, tenant_id: &str, title_id: &str) -> QueueResult<Option<HoldEntity>> {
        let records = self.scan(|entity| entity.tenant_id == tenant_id
            && entity.title_id == title_id
            && entity.hold_status == HoldStatus::Waiting)?;
        Ok(records.into_iter().min_by_key(|entity| entity.sequence))
    }

    async fn find_ready(&self, tenant_id: &str, title_id: &str) -> QueueResult<Option<HoldEntity>> {
        let records = self.scan(|entity| entity.tenant_id == tenant_id
            && entity.title_id == title_id
            && entity.hold_status == HoldStatus::Ready)?;
        Ok(records.into_iter().next())
    }

    async fn find_active_for_patron(&self, tenant_id: &str, title_id: &str,
                                    patron_id: &str) -> QueueResult<Option<HoldEntity>> {
        let triple_key = Self::active_key(tenant_id, title_id, patron_id);
        let id = match self.active.get(triple_key)? {
            Some(id) => id,
            None => return Ok(None),
        };
        match self.holds.get(id)? {
            Some(value) => Ok(Some(serde_json::from_slice(&value)?)),
            None => Ok(None),
        }
    }

    async fn count_waiting_before(&self, tenant_id: &str, title_id: &str,
                                  sequence: i64) -> QueueResult<u64> {
        let records = self.scan(|entity| entity.tenant_id == tenant_id
            && entity.title_id == title_id
            && entity.hold_status == HoldStatus::Waiting
            && entity.sequence < sequence)?;
        Ok(records.len() as u64)
    }

    async fn find_expired_ready(&self, now: NaiveDateTime) -> QueueResult<Vec<HoldEntity>> {
        let mut records = self.scan(|entity| entity.hold_status == HoldStatus::Ready
            && entity.expires_at.map(|at| now >= at).unwrap_or(false))?;
        records.sort_by_key(|entity| entity.sequence);
        Ok(records)
    }
}
