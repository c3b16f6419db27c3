use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use crate::core::library::HoldStatus;
use crate::hold::domain::model::HoldEntity;
use crate::utils::date::serializer;

// HoldDto is the externally visible view of a hold; position is derived at
// read time from current Waiting membership and never persisted.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct HoldDto {
    pub hold_id: String,
    pub tenant_id: String,
    pub title_id: String,
    pub patron_id: String,
    pub hold_status: HoldStatus,
    pub sequence: i64,
    // 1-based rank in the waiting queue; None unless the hold is Waiting
    pub position: Option<u64>,
    pub ready_at: Option<NaiveDateTime>,
    pub expires_at: Option<NaiveDateTime>,
    pub cancel_reason: Option<String>,
    #[serde(with = "serializer")]
    pub created_at: NaiveDateTime,
}

impl HoldDto {
    pub fn with_position(mut self, position: u64) -> Self {
        self.position = Some(position);
        self
    }
}

impl From<&HoldEntity> for HoldDto {
    fn from(other: &HoldEntity) -> HoldDto {
        HoldDto {
            hold_id: other.hold_id.to_string(),
            tenant_id: other.tenant_id.to_string(),
            title_id: other.title_id.to_string(),
            patron_id: other.patron_id.to_string(),
            hold_status: other.hold_status,
            sequence: other.sequence,
            position: None,
            ready_at: other.ready_at,
            expires_at: other.expires_at,
            cancel_reason: other.cancel_reason.clone(),
            created_at: other.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use crate::core::library::HoldStatus;
    use crate::hold::domain::model::HoldEntity;
    use crate::hold::dto::HoldDto;

    #[tokio::test]
    async fn test_should_build_dto_from_entity() {
        let hold = HoldEntity::new("tenant1", "title1", "patron1", 7, Utc::now().naive_utc());
        let dto = HoldDto::from(&hold);
        assert_eq!(hold.hold_id, dto.hold_id);
        assert_eq!(HoldStatus::Waiting, dto.hold_status);
        assert_eq!(7, dto.sequence);
        assert_eq!(None, dto.position);
    }

    #[tokio::test]
    async fn test_should_attach_position() {
        let hold = HoldEntity::new("tenant1", "title1", "patron1", 7, Utc::now().naive_utc());
        let dto = HoldDto::from(&hold).with_position(3);
        assert_eq!(Some(3), dto.position);
    }
}
