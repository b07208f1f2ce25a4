use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::{
    auth::jwt,
    error::{is_unique_violation, AppError},
    follows::{
        FollowListQuery, FollowRequest, FollowStatusQuery, FollowStatusResponse, FollowedUser,
        UnfollowQuery,
    },
    profiles::{fallback_display_name, fallback_username},
};

/// Follow a user
/// POST /follows
pub async fn follow_user(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<FollowRequest>,
) -> Result<impl IntoResponse, AppError> {
    let following_id = payload
        .following_id
        .ok_or_else(|| AppError::BadRequest("followingId is required".to_string()))?;

    if following_id == claims.sub {
        return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
    }

    // Duplicate edges surface as a unique violation on the ordered pair
    sqlx::query("INSERT INTO follows (id, follower_id, following_id) VALUES ($1, $2, $3)")
    .bind(Uuid::new_v4())
    .bind(claims.sub)
    .bind(following_id)
    .execute(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e, "follows_follower_id_following_id_key") {
            AppError::Conflict("Already following this user".to_string())
        } else {
            tracing::error!("Failed to create follow: {:?}", e);
            AppError::InternalServerError
        }
    })?;

    Ok(Json(json!({ "success": true })))
}

/// Unfollow a user
/// DELETE /follows?followingId=...
pub async fn unfollow_user(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Query(query): Query<UnfollowQuery>,
) -> Result<impl IntoResponse, AppError> {
    let following_id = query
        .following_id
        .ok_or_else(|| AppError::BadRequest("followingId is required".to_string()))?;

    let result = sqlx::query("DELETE FROM follows WHERE follower_id = $1 AND following_id = $2")
        .bind(claims.sub)
        .bind(following_id)
        .execute(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound(
            "Follow relationship not found".to_string(),
        ));
    }

    Ok(Json(json!({ "success": true })))
}

/// Helper struct for fetching the user on the far end of a follow edge
#[derive(FromRow)]
struct FollowRow {
    id: Uuid,
    username: Option<String>,
    display_name: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<FollowRow> for FollowedUser {
    fn from(row: FollowRow) -> Self {
        let username = row
            .username
            .clone()
            .unwrap_or_else(|| fallback_username(&row.id));
        let display_name = row
            .display_name
            .or(row.username)
            .unwrap_or_else(|| fallback_display_name(&row.id));
        FollowedUser {
            id: row.id,
            username,
            display_name,
            followed_at: row.created_at,
        }
    }
}

/// List who a user follows, or who follows them
/// GET /follows?type=following|followers&userId=...
pub async fn list_follows(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Query(query): Query<FollowListQuery>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = query.user_id.unwrap_or(claims.sub);

    // Profiles are left-joined: an edge can point at a user who has not
    // been provisioned yet
    let sql = if query.r#type.as_deref() == Some("followers") {
        r#"
        SELECT f.follower_id AS id, p.username, p.display_name, f.created_at
        FROM follows f
        LEFT JOIN profiles p ON f.follower_id = p.user_id
        WHERE f.following_id = $1
        ORDER BY f.created_at DESC
        "#
    } else {
        r#"
        SELECT f.following_id AS id, p.username, p.display_name, f.created_at
        FROM follows f
        LEFT JOIN profiles p ON f.following_id = p.user_id
        WHERE f.follower_id = $1
        ORDER BY f.created_at DESC
        "#
    };

    let rows = sqlx::query_as::<_, FollowRow>(sql)
        .bind(user_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list follows: {:?}", e);
            AppError::InternalServerError
        })?;

    let users: Vec<FollowedUser> = rows.into_iter().map(FollowedUser::from).collect();

    Ok(Json(json!({ "users": users })))
}

/// Follow relationship between the caller and a target user, plus the
/// target's counts
/// GET /follows/status?userId=...
pub async fn follow_status(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Query(query): Query<FollowStatusQuery>,
) -> Result<impl IntoResponse, AppError> {
    let target_id = query
        .user_id
        .ok_or_else(|| AppError::BadRequest("userId is required".to_string()))?;

    let is_following = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
    )
    .bind(claims.sub)
    .bind(target_id)
    .fetch_one(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    let is_followed_by = sqlx::query_scalar::<_, bool>(
        "SELECT EXISTS(SELECT 1 FROM follows WHERE follower_id = $1 AND following_id = $2)",
    )
    .bind(target_id)
    .bind(claims.sub)
    .fetch_one(&pool)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    let following_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(target_id)
            .fetch_one(&pool)
            .await
            .map_err(|_| AppError::InternalServerError)?;

    let followers_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM follows WHERE following_id = $1")
            .bind(target_id)
            .fetch_one(&pool)
            .await
            .map_err(|_| AppError::InternalServerError)?;

    Ok(Json(FollowStatusResponse {
        is_following,
        is_followed_by,
        following_count,
        followers_count,
    }))
}
