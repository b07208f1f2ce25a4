use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod handler;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowRequest {
    pub following_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnfollowQuery {
    pub following_id: Option<Uuid>,
}

/// Query parameters for the follow listing: `type` selects the edge
/// direction, `userId` defaults to the caller.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowListQuery {
    pub r#type: Option<String>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatusQuery {
    pub user_id: Option<Uuid>,
}

/// A user on either end of a follow edge, for followers/following lists.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowedUser {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub followed_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowStatusResponse {
    pub is_following: bool,
    pub is_followed_by: bool,
    pub following_count: i64,
    pub followers_count: i64,
}
