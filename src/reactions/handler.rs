use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::jwt,
    error::AppError,
    reactions::{
        AddReactionRequest, ReactionAggregate, ReactionType, ReactionsQuery, RemoveReactionQuery,
        UserReaction,
    },
};

/// Add a reaction to a check-in. Re-adding a type the user already holds
/// is a no-op success.
/// POST /reactions
pub async fn add_reaction(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<AddReactionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (checkin_id, raw_type) = match (payload.checkin_id, payload.reaction_type.as_deref()) {
        (Some(checkin_id), Some(raw_type)) => (checkin_id, raw_type),
        _ => {
            return Err(AppError::BadRequest(
                "checkinId and reactionType are required".to_string(),
            ))
        }
    };

    let reaction_type = ReactionType::parse(raw_type)
        .ok_or_else(|| AppError::BadRequest("Invalid reaction type".to_string()))?;

    // Verify the target exists
    sqlx::query("SELECT id FROM checkins WHERE id = $1")
        .bind(checkin_id)
        .fetch_optional(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?
        .ok_or(AppError::NotFound("Checkin not found".to_string()))?;

    // Insert re-adds of the same type land on the unique constraint
    sqlx::query(
        r#"
        INSERT INTO reactions (id, user_id, checkin_id, reaction_type)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (user_id, checkin_id, reaction_type) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(claims.sub)
    .bind(checkin_id)
    .bind(reaction_type)
    .execute(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to add reaction: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(Json(json!({ "success": true })))
}

/// Remove the caller's reaction of a given type, or all of the caller's
/// reactions on the check-in when no type is given. Deleting zero rows
/// is still success.
/// DELETE /reactions?checkinId=...&reactionType=...
pub async fn remove_reaction(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Query(query): Query<RemoveReactionQuery>,
) -> Result<impl IntoResponse, AppError> {
    let checkin_id = query
        .checkin_id
        .ok_or_else(|| AppError::BadRequest("checkinId is required".to_string()))?;

    match query.reaction_type.as_deref() {
        Some(raw_type) => {
            let reaction_type = ReactionType::parse(raw_type)
                .ok_or_else(|| AppError::BadRequest("Invalid reaction type".to_string()))?;

            sqlx::query(
                "DELETE FROM reactions WHERE user_id = $1 AND checkin_id = $2 AND reaction_type = $3",
            )
            .bind(claims.sub)
            .bind(checkin_id)
            .bind(reaction_type)
            .execute(&pool)
            .await
            .map_err(|_| AppError::InternalServerError)?;
        }
        None => {
            sqlx::query("DELETE FROM reactions WHERE user_id = $1 AND checkin_id = $2")
                .bind(claims.sub)
                .bind(checkin_id)
                .execute(&pool)
                .await
                .map_err(|_| AppError::InternalServerError)?;
        }
    }

    Ok(Json(json!({ "success": true })))
}

/// Read reactions: per-type aggregates for a check-in, or everything a
/// user has reacted to.
/// GET /reactions?checkinId=... | ?userId=...
pub async fn get_reactions(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Query(query): Query<ReactionsQuery>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(checkin_id) = query.checkin_id {
        let reactions = sqlx::query_as::<_, ReactionAggregate>(
            r#"
            SELECT reaction_type, COUNT(*) AS count, BOOL_OR(user_id = $1) AS user_reacted
            FROM reactions
            WHERE checkin_id = $2
            GROUP BY reaction_type
            ORDER BY reaction_type
            "#,
        )
        .bind(claims.sub)
        .bind(checkin_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch reactions: {:?}", e);
            AppError::InternalServerError
        })?;

        let user_reactions = sqlx::query_scalar::<_, ReactionType>(
            "SELECT reaction_type FROM reactions WHERE user_id = $1 AND checkin_id = $2",
        )
        .bind(claims.sub)
        .bind(checkin_id)
        .fetch_all(&pool)
        .await
        .map_err(|_| AppError::InternalServerError)?;

        return Ok(Json(
            json!({ "reactions": reactions, "userReactions": user_reactions }),
        ));
    }

    if let Some(user_id) = query.user_id {
        let reactions = sqlx::query_as::<_, UserReaction>(
            r#"
            SELECT r.id, r.user_id, r.checkin_id, r.reaction_type, r.created_at,
                   c.photo_url, c.created_at AS checkin_created_at
            FROM reactions r
            JOIN checkins c ON r.checkin_id = c.id
            WHERE r.user_id = $1
            ORDER BY r.created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch user reactions: {:?}", e);
            AppError::InternalServerError
        })?;

        return Ok(Json(json!({ "reactions": reactions })));
    }

    Err(AppError::BadRequest(
        "checkinId or userId is required".to_string(),
    ))
}
