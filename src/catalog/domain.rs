use std::collections::HashSet;
use async_trait::async_trait;

use crate::core::library::QueueResult;

// CatalogService is the catalog collaborator seam; the engine only asks
// whether a title takes holds, e.g. unlimited-copy titles do not.
#[async_trait]
pub trait CatalogService: Sync + Send {
    async fn title_supports_holds(&self, tenant_id: &str, title_id: &str) -> QueueResult<bool>;
}

// StaticCatalog stands in for the external catalog in tests and demos
#[derive(Debug, Default)]
pub struct StaticCatalog {
    ineligible: HashSet<(String, String)>,
}

impl StaticCatalog {
    pub fn allow_all() -> Self {
        Self { ineligible: HashSet::new() }
    }

    pub fn deny(mut self, tenant_id: &str, title_id: &str) -> Self {
        self.ineligible.insert((tenant_id.to_string(), title_id.to_string()));
        self
    }
}

#[async_trait]
impl CatalogService for StaticCatalog {
    async fn title_supports_holds(&self, tenant_id: &str, title_id: &str) -> QueueResult<bool> {
        Ok(!self.ineligible.contains(&(tenant_id.to_string(), title_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use crate::catalog::domain::{CatalogService, StaticCatalog};

    #[tokio::test]
    async fn test_should_allow_holds_by_default() {
        let catalog = StaticCatalog::allow_all();
        assert!(catalog.title_supports_holds("tenant1", "title1").await.expect("should query catalog"));
    }

    #[tokio::test]
    async fn test_should_deny_ineligible_title() {
        let catalog = StaticCatalog::allow_all().deny("tenant1", "title1");
        assert!(!catalog.title_supports_holds("tenant1", "title1").await.expect("should query catalog"));
        assert!(catalog.title_supports_holds("tenant1", "title2").await.expect("should query catalog"));
    }
}
