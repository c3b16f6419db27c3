use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::core::domain::Identifiable;
use crate::core::library::{CancelActor, HoldStatus, QueueError, QueueResult};
use crate::utils::date::serializer;

pub const TIMEOUT_CANCEL_REASON: &str = "pickup window elapsed";

// HoldEntity is one patron's claim on one title within one tenant. The
// transition methods are the only way status changes; each one enforces the
// forward-only state graph:
//
//   Waiting -> Ready | CancelledByPatron
//   Ready   -> Fulfilled | CancelledByTimeout | CancelledByPatron
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct HoldEntity {
    pub hold_id: String,
    pub version: i64,
    pub tenant_id: String,
    pub title_id: String,
    pub patron_id: String,
    pub hold_status: HoldStatus,
    // per-tenant monotonic insertion number; the only queue ordering key
    pub sequence: i64,
    pub ready_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
    pub cancel_reason: Option<String>,
    #[serde(with = "serializer")]
    pub created_at: NaiveDateTime,
    #[serde(with = "serializer")]
    pub updated_at: NaiveDateTime,
}

impl HoldEntity {
    pub fn new(tenant_id: &str, title_id: &str, patron_id: &str,
               sequence: i64, now: NaiveDateTime) -> Self {
        Self {
            hold_id: Uuid::new_v4().to_string(),
            version: 0,
            tenant_id: tenant_id.to_string(),
            title_id: title_id.to_string(),
            patron_id: patron_id.to_string(),
            hold_status: HoldStatus::Waiting,
            sequence,
            ready_at: None,
            expires_at: None,
            cancel_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_active(&self) -> bool {
        self.hold_status.is_active()
    }

    // Waiting -> Ready; opens the pickup window
    pub fn promote(&mut self, now: NaiveDateTime, pickup_window: Duration) -> QueueResult<()> {
        if self.hold_status != HoldStatus::Waiting {
            return Err(QueueError::not_ready(
                format!("hold {} cannot be promoted from {}", self.hold_id, self.hold_status).as_str()));
        }
        self.hold_status = HoldStatus::Ready;
        self.ready_at = Some(now);
        self.expires_at = Some(now + pickup_window);
        self.updated_at = now;
        Ok(())
    }

    // Ready -> Fulfilled; fails HoldExpired once the window lapsed even if
    // the expiry timer has not fired yet
    pub fn fulfill(&mut self, now: NaiveDateTime) -> QueueResult<()> {
        if self.hold_status != HoldStatus::Ready {
            return Err(QueueError::not_ready(
                format!("hold {} is {} and cannot be fulfilled", self.hold_id, self.hold_status).as_str()));
        }
        let expires_at = self.expires_at.ok_or_else(|| QueueError::runtime(
            format!("ready hold {} has no expiry", self.hold_id).as_str(), None))?;
        if now >= expires_at {
            return Err(QueueError::expired(
                format!("hold {} expired at {}", self.hold_id, expires_at).as_str()));
        }
        self.hold_status = HoldStatus::Fulfilled;
        self.updated_at = now;
        Ok(())
    }

    // Waiting|Ready -> CancelledByPatron
    pub fn cancel(&mut self, actor: CancelActor, now: NaiveDateTime) -> QueueResult<()> {
        if self.hold_status.is_terminal() {
            return Err(QueueError::already_terminal(
                format!("hold {} is already {}", self.hold_id, self.hold_status).as_str()));
        }
        self.hold_status = HoldStatus::CancelledByPatron;
        self.cancel_reason = Some(format!("cancelled by {}", actor));
        self.updated_at = now;
        Ok(())
    }

    // Ready -> CancelledByTimeout
    pub fn forfeit(&mut self, now: NaiveDateTime) -> QueueResult<()> {
        if self.hold_status != HoldStatus::Ready {
            return Err(QueueError::not_ready(
                format!("hold {} is {} and cannot be forfeited", self.hold_id, self.hold_status).as_str()));
        }
        self.hold_status = HoldStatus::CancelledByTimeout;
        self.cancel_reason = Some(TIMEOUT_CANCEL_REASON.to_string());
        self.updated_at = now;
        Ok(())
    }
}

impl Identifiable for HoldEntity {
    fn id(&self) -> String {
        self.hold_id.to_string()
    }

    fn version(&self) -> i64 {
        self.version
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};
    use crate::core::library::{CancelActor, HoldStatus, QueueError};
    use crate::hold::domain::model::{HoldEntity, TIMEOUT_CANCEL_REASON};

    fn waiting_hold() -> HoldEntity {
        HoldEntity::new("tenant1", "title1", "patron1", 1, Utc::now().naive_utc())
    }

    #[tokio::test]
    async fn test_should_build_waiting_hold() {
        let hold = waiting_hold();
        assert_eq!("tenant1", hold.tenant_id.as_str());
        assert_eq!("title1", hold.title_id.as_str());
        assert_eq!("patron1", hold.patron_id.as_str());
        assert_eq!(HoldStatus::Waiting, hold.hold_status);
        assert_eq!(1, hold.sequence);
        assert_eq!(None, hold.ready_at);
        assert_eq!(None, hold.expires_at);
    }

    #[tokio::test]
    async fn test_should_promote_and_fulfill() {
        let mut hold = waiting_hold();
        let now = Utc::now().naive_utc();
        hold.promote(now, Duration::hours(48)).expect("should promote");
        assert_eq!(HoldStatus::Ready, hold.hold_status);
        assert_eq!(Some(now), hold.ready_at);
        assert_eq!(Some(now + Duration::hours(48)), hold.expires_at);

        hold.fulfill(now + Duration::hours(1)).expect("should fulfill");
        assert_eq!(HoldStatus::Fulfilled, hold.hold_status);
    }

    #[tokio::test]
    async fn test_should_reject_fulfill_after_window() {
        let mut hold = waiting_hold();
        let now = Utc::now().naive_utc();
        hold.promote(now, Duration::hours(48)).expect("should promote");
        let res = hold.fulfill(now + Duration::hours(49));
        assert!(matches!(res, Err(QueueError::HoldExpired { message: _ })));
        assert_eq!(HoldStatus::Ready, hold.hold_status);
    }

    #[tokio::test]
    async fn test_should_reject_fulfill_of_waiting_hold() {
        let mut hold = waiting_hold();
        let res = hold.fulfill(Utc::now().naive_utc());
        assert!(matches!(res, Err(QueueError::HoldNotReady { message: _ })));
    }

    #[tokio::test]
    async fn test_should_forfeit_ready_hold() {
        let mut hold = waiting_hold();
        let now = Utc::now().naive_utc();
        hold.promote(now, Duration::hours(48)).expect("should promote");
        hold.forfeit(now + Duration::hours(49)).expect("should forfeit");
        assert_eq!(HoldStatus::CancelledByTimeout, hold.hold_status);
        assert_eq!(Some(TIMEOUT_CANCEL_REASON.to_string()), hold.cancel_reason);
    }

    #[tokio::test]
    async fn test_should_cancel_waiting_and_ready_holds() {
        let mut waiting = waiting_hold();
        let now = Utc::now().naive_utc();
        waiting.cancel(CancelActor::Patron, now).expect("should cancel");
        assert_eq!(HoldStatus::CancelledByPatron, waiting.hold_status);

        let mut ready = waiting_hold();
        ready.promote(now, Duration::hours(48)).expect("should promote");
        ready.cancel(CancelActor::Staff, now).expect("should cancel");
        assert_eq!(HoldStatus::CancelledByPatron, ready.hold_status);
        assert_eq!(Some("cancelled by staff".to_string()), ready.cancel_reason);
    }

    #[tokio::test]
    async fn test_should_reject_transitions_out_of_terminal_states() {
        let mut hold = waiting_hold();
        let now = Utc::now().naive_utc();
        hold.cancel(CancelActor::Patron, now).expect("should cancel");

        assert!(matches!(hold.promote(now, Duration::hours(48)),
            Err(QueueError::HoldNotReady { message: _ })));
        assert!(matches!(hold.fulfill(now), Err(QueueError::HoldNotReady { message: _ })));
        assert!(matches!(hold.forfeit(now), Err(QueueError::HoldNotReady { message: _ })));
        assert!(matches!(hold.cancel(CancelActor::Patron, now),
            Err(QueueError::HoldAlreadyTerminal { message: _ })));
    }

    #[tokio::test]
    async fn test_should_round_trip_hold_json() {
        let mut hold = waiting_hold();
        let now = Utc::now().naive_utc();
        hold.promote(now, Duration::hours(48)).expect("should promote");
        let json = serde_json::to_string(&hold).expect("should serialize hold");
        let parsed: HoldEntity = serde_json::from_str(json.as_str()).expect("should parse hold");
        assert_eq!(hold, parsed);
    }
}
