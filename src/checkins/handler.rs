use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    auth::jwt,
    checkins::{
        Checkin, CreateCheckinRequest, HistoryQuery, COOLDOWN_WINDOW_MINUTES, HISTORY_PAGE_SIZE,
    },
    error::AppError,
    profiles::handler::ensure_profile,
    social::page_window,
};

/// Record a check-in
/// POST /checkins
pub async fn create_checkin(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<CreateCheckinRequest>,
) -> Result<impl IntoResponse, AppError> {
    let photo_url = payload
        .photo_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("photoUrl required".to_string()))?;

    // Also guarantees a profile row to lock below.
    ensure_profile(&pool, claims.sub, claims.email.as_deref()).await?;

    let mut tx = pool
        .begin()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    // Row lock serializes a user's concurrent check-in attempts so the
    // cooldown check and the insert act as one step
    sqlx::query("SELECT user_id FROM profiles WHERE user_id = $1 FOR UPDATE")
        .bind(claims.sub)
        .fetch_one(&mut *tx)
        .await
        .map_err(|_| AppError::InternalServerError)?;

    let now = chrono::Utc::now();
    let since = now - chrono::Duration::minutes(COOLDOWN_WINDOW_MINUTES);

    let recent = sqlx::query(
        "SELECT id FROM checkins WHERE user_id = $1 AND created_at >= $2 ORDER BY created_at DESC LIMIT 1",
    )
    .bind(claims.sub)
    .bind(since)
    .fetch_optional(&mut *tx)
    .await
    .map_err(|_| AppError::InternalServerError)?;

    if recent.is_some() {
        return Err(AppError::TooManyRequests(format!(
            "Already checked in within the last {} minutes",
            COOLDOWN_WINDOW_MINUTES
        )));
    }

    sqlx::query(
        r#"
        INSERT INTO checkins (id, user_id, photo_url, location, device_info, created_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(claims.sub)
    .bind(photo_url)
    .bind(&payload.location)
    .bind(&payload.device_info)
    .bind(now)
    .execute(&mut *tx)
    .await
    .map_err(|e| {
        tracing::error!("Failed to create checkin: {:?}", e);
        AppError::InternalServerError
    })?;

    tx.commit()
        .await
        .map_err(|_| AppError::InternalServerError)?;

    Ok((StatusCode::CREATED, Json(json!({ "ok": true }))))
}

/// List the caller's own check-ins, newest first. Without a page
/// parameter the listing is capped at 30; with one, the full history is
/// paged at 30/page and out-of-range pages clamp to the last one.
/// GET /checkins[?page=N]
pub async fn list_checkins(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Query(query): Query<HistoryQuery>,
) -> Result<impl IntoResponse, AppError> {
    let offset = match query.page {
        None => 0,
        Some(requested) => {
            let total = sqlx::query_scalar::<_, i64>(
                "SELECT COUNT(*) FROM checkins WHERE user_id = $1",
            )
            .bind(claims.sub)
            .fetch_one(&pool)
            .await
            .map_err(|_| AppError::InternalServerError)?;

            let (page, _) = page_window(requested, total, HISTORY_PAGE_SIZE);
            (page - 1) * HISTORY_PAGE_SIZE
        }
    };

    let checkins = sqlx::query_as::<_, Checkin>(
        r#"
        SELECT id, user_id, photo_url, created_at, location, device_info
        FROM checkins
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2 OFFSET $3
        "#,
    )
    .bind(claims.sub)
    .bind(HISTORY_PAGE_SIZE)
    .bind(offset)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to list checkins: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(Json(checkins))
}
