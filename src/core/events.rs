use chrono::{NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::utils::date::serializer;

// HoldEventKind defines the outbound notifications the engine emits
#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum HoldEventKind {
    // the pickup window opened for a promoted hold
    Ready,
    // the pickup window lapsed and the hold was cancelled
    Forfeited,
}

// HoldEvent abstracts the payload handed to the notifier adapter; the engine
// decides that and when to notify, never how a message is delivered.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct HoldEvent {
    pub event_id: String,
    pub kind: HoldEventKind,
    pub hold_id: String,
    pub tenant_id: String,
    pub title_id: String,
    pub patron_id: String,
    pub expires_at: Option<NaiveDateTime>,
    pub reason: Option<String>,
    #[serde(with = "serializer")]
    pub created_at: NaiveDateTime,
}

impl HoldEvent {
    pub fn ready(hold_id: &str, tenant_id: &str, title_id: &str,
                 patron_id: &str, expires_at: NaiveDateTime) -> Self {
        Self::build(HoldEventKind::Ready, hold_id, tenant_id, title_id,
                    patron_id, Some(expires_at), None)
    }

    pub fn forfeited(hold_id: &str, tenant_id: &str, title_id: &str,
                     patron_id: &str, reason: &str) -> Self {
        Self::build(HoldEventKind::Forfeited, hold_id, tenant_id, title_id,
                    patron_id, None, Some(reason.to_string()))
    }

    fn build(kind: HoldEventKind, hold_id: &str, tenant_id: &str, title_id: &str,
             patron_id: &str, expires_at: Option<NaiveDateTime>, reason: Option<String>) -> HoldEvent {
        HoldEvent {
            event_id: Uuid::new_v4().to_string(),
            kind,
            hold_id: hold_id.to_string(),
            tenant_id: tenant_id.to_string(),
            title_id: title_id.to_string(),
            patron_id: patron_id.to_string(),
            expires_at,
            reason,
            created_at: Utc::now().naive_utc(),
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use crate::core::events::{HoldEvent, HoldEventKind};

    #[tokio::test]
    async fn test_should_build_ready_event() {
        let expires_at = Utc::now().naive_utc();
        let event = HoldEvent::ready("hold1", "tenant1", "title1", "patron1", expires_at);
        assert_eq!(HoldEventKind::Ready, event.kind);
        assert_eq!("hold1", event.hold_id.as_str());
        assert_eq!(Some(expires_at), event.expires_at);
        assert_eq!(None, event.reason);
    }

    #[tokio::test]
    async fn test_should_build_forfeited_event() {
        let event = HoldEvent::forfeited("hold1", "tenant1", "title1", "patron1", "pickup window elapsed");
        assert_eq!(HoldEventKind::Forfeited, event.kind);
        assert_eq!(None, event.expires_at);
        assert_eq!(Some("pickup window elapsed".to_string()), event.reason);
    }

    #[tokio::test]
    async fn test_should_serialize_event() {
        let event = HoldEvent::forfeited("hold1", "tenant1", "title1", "patron1", "pickup window elapsed");
        let json = serde_json::to_string(&event).expect("should serialize event");
        let parsed: HoldEvent = serde_json::from_str(json.as_str()).expect("should parse event");
        assert_eq!(event, parsed);
    }
}
