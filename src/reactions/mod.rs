use serde::{Deserialize, Serialize};
use sqlx::prelude::Type;
use uuid::Uuid;

pub mod handler;

/// The closed set of reactions a user can place on a check-in. A user
/// may hold one of each type on the same check-in simultaneously.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "reaction_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ReactionType {
    Haha,
    Heart,
    Wow,
}

impl ReactionType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "haha" => Some(ReactionType::Haha),
            "heart" => Some(ReactionType::Heart),
            "wow" => Some(ReactionType::Wow),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReactionRequest {
    pub checkin_id: Option<Uuid>,
    pub reaction_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveReactionQuery {
    pub checkin_id: Option<Uuid>,
    pub reaction_type: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionsQuery {
    pub checkin_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

/// Per-type aggregate for one check-in: how many users reacted with the
/// type, and whether the requesting user is among them.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ReactionAggregate {
    #[serde(rename = "type")]
    #[sqlx(rename = "reaction_type")]
    pub kind: ReactionType,
    pub count: i64,
    pub user_reacted: bool,
}

/// One of a user's reactions joined with its target check-in, for the
/// reactions-by-user listing.
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserReaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub checkin_id: Uuid,
    pub reaction_type: ReactionType,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub photo_url: String,
    pub checkin_created_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_types() {
        assert_eq!(ReactionType::parse("haha"), Some(ReactionType::Haha));
        assert_eq!(ReactionType::parse("heart"), Some(ReactionType::Heart));
        assert_eq!(ReactionType::parse("wow"), Some(ReactionType::Wow));
    }

    #[test]
    fn rejects_unknown_types() {
        assert_eq!(ReactionType::parse("like"), None);
        assert_eq!(ReactionType::parse("HEART"), None);
        assert_eq!(ReactionType::parse(""), None);
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(
            serde_json::to_value(ReactionType::Heart).unwrap(),
            serde_json::json!("heart")
        );
    }

    #[test]
    fn aggregate_wire_shape() {
        let aggregate = ReactionAggregate {
            kind: ReactionType::Wow,
            count: 2,
            user_reacted: true,
        };
        let value = serde_json::to_value(&aggregate).unwrap();
        assert_eq!(value["type"], "wow");
        assert_eq!(value["count"], 2);
        assert_eq!(value["userReacted"], true);
    }
}
