use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    auth::jwt,
    error::AppError,
    profiles::{fallback_display_name, fallback_username},
    reactions::{ReactionAggregate, ReactionType},
    social::{
        FeedItem, FeedOwner, FeedQuery, FeedResponse, Pagination, FEED_DEFAULT_LIMIT,
        FEED_MAX_LIMIT,
    },
};

/// Helper struct for fetching feed check-ins with owner profile info
#[derive(FromRow)]
struct FeedRow {
    id: Uuid,
    user_id: Uuid,
    photo_url: String,
    created_at: chrono::DateTime<chrono::Utc>,
    location: Option<String>,
    device_info: Option<String>,
    username: Option<String>,
    display_name: Option<String>,
}

#[derive(FromRow)]
struct AggregateRow {
    checkin_id: Uuid,
    #[sqlx(rename = "reaction_type")]
    kind: ReactionType,
    count: i64,
    user_reacted: bool,
}

#[derive(FromRow)]
struct OwnReactionRow {
    checkin_id: Uuid,
    reaction_type: ReactionType,
}

/// Paginated feed of check-ins from followed users
/// GET /social/feed?page&limit
pub async fn get_feed(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, AppError> {
    let limit = query
        .limit
        .unwrap_or(FEED_DEFAULT_LIMIT)
        .clamp(1, FEED_MAX_LIMIT);
    let requested_page = query.page.unwrap_or(1);

    let total = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM checkins c
        JOIN follows f ON c.user_id = f.following_id
        WHERE f.follower_id = $1
        "#,
    )
    .bind(claims.sub)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Feed count error: {:?}", e);
        AppError::InternalServerError
    })?;

    let pagination = Pagination::new(requested_page, limit, total);
    let offset = (pagination.page - 1) * limit;

    let rows = sqlx::query_as::<_, FeedRow>(
        r#"
        SELECT c.id, c.user_id, c.photo_url, c.created_at, c.location, c.device_info,
               p.username, p.display_name
        FROM checkins c
        JOIN follows f ON c.user_id = f.following_id AND f.follower_id = $1
        LEFT JOIN profiles p ON c.user_id = p.user_id
        ORDER BY c.created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(claims.sub)
    .bind(limit)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Feed error: {:?}", e);
        AppError::InternalServerError
    })?;

    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let mut aggregates: HashMap<Uuid, Vec<ReactionAggregate>> = HashMap::new();
    let mut own_reactions: HashMap<Uuid, Vec<ReactionType>> = HashMap::new();

    if !ids.is_empty() {
        let aggregate_rows = sqlx::query_as::<_, AggregateRow>(
            r#"
            SELECT checkin_id, reaction_type, COUNT(*) AS count, BOOL_OR(user_id = $1) AS user_reacted
            FROM reactions
            WHERE checkin_id = ANY($2)
            GROUP BY checkin_id, reaction_type
            ORDER BY checkin_id, reaction_type
            "#,
        )
        .bind(claims.sub)
        .bind(&ids)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Feed reactions error: {:?}", e);
            AppError::InternalServerError
        })?;

        for row in aggregate_rows {
            aggregates
                .entry(row.checkin_id)
                .or_default()
                .push(ReactionAggregate {
                    kind: row.kind,
                    count: row.count,
                    user_reacted: row.user_reacted,
                });
        }

        let own_rows = sqlx::query_as::<_, OwnReactionRow>(
            "SELECT checkin_id, reaction_type FROM reactions WHERE user_id = $1 AND checkin_id = ANY($2)",
        )
        .bind(claims.sub)
        .bind(&ids)
        .fetch_all(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;

        for row in own_rows {
            own_reactions
                .entry(row.checkin_id)
                .or_default()
                .push(row.reaction_type);
        }
    }

    let checkins: Vec<FeedItem> = rows
        .into_iter()
        .map(|row| FeedItem {
            user: FeedOwner {
                id: row.user_id,
                username: row
                    .username
                    .unwrap_or_else(|| fallback_username(&row.user_id)),
                display_name: row
                    .display_name
                    .unwrap_or_else(|| fallback_display_name(&row.user_id)),
            },
            reactions: aggregates.remove(&row.id).unwrap_or_default(),
            user_reactions: own_reactions.remove(&row.id).unwrap_or_default(),
            id: row.id,
            photo_url: row.photo_url,
            created_at: row.created_at,
            location: row.location,
            device_info: row.device_info,
        })
        .collect();

    Ok(Json(FeedResponse {
        checkins,
        pagination,
    }))
}
