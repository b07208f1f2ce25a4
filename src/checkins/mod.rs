use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod handler;

/// Minimum spacing between a user's consecutive check-ins.
pub const COOLDOWN_WINDOW_MINUTES: i64 = 10;

/// Number of check-ins returned per history page (and the cap on the
/// unpaged listing).
pub const HISTORY_PAGE_SIZE: i64 = 30;

/// Database model for a single capture event. Immutable once written.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Checkin {
    pub id: Uuid,
    pub user_id: Uuid,
    pub photo_url: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub location: Option<String>,
    pub device_info: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCheckinRequest {
    pub photo_url: Option<String>,
    pub location: Option<String>,
    pub device_info: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub page: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn checkin_serializes_camel_case() {
        let checkin = Checkin {
            id: Uuid::nil(),
            user_id: Uuid::nil(),
            photo_url: "https://x/1.jpg".to_string(),
            created_at: chrono::Utc::now(),
            location: None,
            device_info: Some("pixel 8".to_string()),
        };
        let value = serde_json::to_value(&checkin).unwrap();
        assert_eq!(value["photoUrl"], "https://x/1.jpg");
        assert_eq!(value["deviceInfo"], "pixel 8");
        assert!(value.get("photo_url").is_none());
        assert!(value["createdAt"].is_string());
    }

    #[test]
    fn create_request_accepts_optional_telemetry() {
        let payload: CreateCheckinRequest =
            serde_json::from_str(r#"{"photoUrl":"https://x/1.jpg"}"#).unwrap();
        assert_eq!(payload.photo_url.as_deref(), Some("https://x/1.jpg"));
        assert!(payload.location.is_none());
        assert!(payload.device_info.is_none());
    }
}
