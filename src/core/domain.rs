use std::collections::HashMap;
use async_trait::async_trait;
use chrono::Duration;

use crate::core::library::QueueResult;

// Identifiable defines common traits that can be shared by persistent objects
pub trait Identifiable: Sync + Send {
    fn id(&self) -> String;
    fn version(&self) -> i64;
}

pub const DEFAULT_PICKUP_WINDOW_HOURS: i64 = 48;

// TenantSettings abstracts per-tenant queue configuration. The pickup window
// bounds how long a Ready hold may wait for the patron before forfeiture.
#[derive(Debug, PartialEq, Eq, Clone)]
pub struct TenantSettings {
    pub tenant_id: String,
    pub pickup_window: Duration,
}

impl TenantSettings {
    pub fn new(tenant_id: &str) -> Self {
        TenantSettings {
            tenant_id: tenant_id.to_string(),
            pickup_window: Duration::hours(DEFAULT_PICKUP_WINDOW_HOURS),
        }
    }

    pub fn with_pickup_window_hours(tenant_id: &str, hours: i64) -> Self {
        TenantSettings {
            tenant_id: tenant_id.to_string(),
            pickup_window: Duration::hours(hours),
        }
    }

    // sub-hour windows are allowed so expiry can be exercised in real time
    pub fn with_pickup_window(tenant_id: &str, window: Duration) -> Self {
        TenantSettings {
            tenant_id: tenant_id.to_string(),
            pickup_window: window,
        }
    }
}

// Supplies tenant configuration; backed by the tenant-settings collaborator
// in production and by a static table in tests.
#[async_trait]
pub trait TenantSettingsProvider: Sync + Send {
    async fn settings_for(&self, tenant_id: &str) -> QueueResult<TenantSettings>;
}

#[derive(Debug, Default)]
pub struct StaticSettingsProvider {
    overrides: HashMap<String, TenantSettings>,
}

impl StaticSettingsProvider {
    pub fn new() -> Self {
        Self { overrides: HashMap::new() }
    }

    pub fn with_tenant(mut self, settings: TenantSettings) -> Self {
        self.overrides.insert(settings.tenant_id.to_string(), settings);
        self
    }
}

#[async_trait]
impl TenantSettingsProvider for StaticSettingsProvider {
    async fn settings_for(&self, tenant_id: &str) -> QueueResult<TenantSettings> {
        Ok(self.overrides.get(tenant_id).cloned()
            .unwrap_or_else(|| TenantSettings::new(tenant_id)))
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use crate::core::domain::{StaticSettingsProvider, TenantSettings, TenantSettingsProvider};

    #[tokio::test]
    async fn test_should_build_default_settings() {
        let settings = TenantSettings::new("tenant1");
        assert_eq!(Duration::hours(48), settings.pickup_window);
    }

    #[tokio::test]
    async fn test_should_build_settings_with_hours() {
        let settings = TenantSettings::with_pickup_window_hours("tenant1", 24);
        assert_eq!(Duration::hours(24), settings.pickup_window);
    }

    #[tokio::test]
    async fn test_should_resolve_settings_with_override() {
        let provider = StaticSettingsProvider::new()
            .with_tenant(TenantSettings::with_pickup_window_hours("tenant1", 12));
        let settings = provider.settings_for("tenant1").await.expect("should resolve settings");
        assert_eq!(Duration::hours(12), settings.pickup_window);
        let other = provider.settings_for("tenant2").await.expect("should resolve settings");
        assert_eq!(Duration::hours(48), other.pickup_window);
    }
}
