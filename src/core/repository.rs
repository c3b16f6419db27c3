use async_trait::async_trait;
use core::option::Option;
use std::collections::HashMap;
use std::future::Future;
use rand::Rng;
use serde::{Deserialize, Serialize};
use crate::core::library::{PaginatedResult, QueueResult};
use crate::gateway::GatewayPublisherVia;

#[async_trait]
pub trait Repository<Entity>: Sync + Send {
    // create an entity; implementations enforce compare-and-insert semantics
    async fn create(&self, entity: &Entity) -> QueueResult<usize>;

    // updates an entity; implementations compare-and-swap on version
    async fn update(&self, entity: &Entity) -> QueueResult<usize>;

    // get an entity
    async fn get(&self, id: &str) -> QueueResult<Entity>;

    // find by predicate, e.g. tenant_id/title_id/hold_status
    async fn query(&self, predicate: &HashMap<String, String>,
                   page: Option<&str>, page_size: usize) -> QueueResult<PaginatedResult<Entity>>;
}

#[derive(Debug, PartialEq, Serialize, Deserialize, Clone, Copy)]
pub enum RepositoryStore {
    Memory,
    Sled,
}

impl RepositoryStore {
    pub fn gateway_publisher(&self) -> GatewayPublisherVia {
        match self {
            RepositoryStore::Memory => { GatewayPublisherVia::Memory }
            RepositoryStore::Sled => { GatewayPublisherVia::Logs }
        }
    }
}

pub const DEFAULT_RETRY_ATTEMPTS: usize = 3;

// Retries retryable store failures a bounded number of times with jittered
// exponential backoff. The closure owns its own critical sections so no lock
// is ever held across a backoff sleep.
pub async fn with_retry<T, F, Fut>(max_attempts: usize, mut call: F) -> QueueResult<T>
    where F: FnMut() -> Fut,
          Fut: Future<Output=QueueResult<T>> {
    let mut delay_ms: u64 = 25;
    let mut attempt: usize = 1;
    loop {
        match call().await {
            Err(err) if err.retryable() && attempt < max_attempts => {
                let jitter = rand::thread_rng().gen_range(0..=delay_ms / 2);
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms + jitter)).await;
                delay_ms = std::cmp::min(delay_ms * 2, 1_000);
                attempt += 1;
            }
            other => {
                return other;
            }
        }
    }
}
