use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use serde_json::json;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;
use validator::Validate;

use crate::{
    auth::jwt,
    error::{is_unique_violation, AppError},
    profiles::{
        base_username, candidate_username, display_name_from_email, is_valid_username, Profile,
        SearchQuery, UpdateBackgroundRequest, UpdateUsernameRequest, UserSummary,
        USERNAME_MIN_LEN,
    },
};

/// Fetch the caller's profile, provisioning one if absent.
///
/// Provisioning is an upsert keyed on user_id, so two concurrent first
/// requests converge on a single row. Username collisions with other
/// users surface as unique violations and bump the numeric suffix.
pub async fn ensure_profile(
    pool: &PgPool,
    user_id: Uuid,
    email: Option<&str>,
) -> Result<Profile, AppError> {
    let existing = sqlx::query_as::<_, Profile>(
        "SELECT id, user_id, username, display_name, background_url, updated_at FROM profiles WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| {
        tracing::error!("Failed to load profile: {:?}", e);
        AppError::InternalServerError
    })?;

    if let Some(profile) = existing {
        return Ok(profile);
    }

    let base = base_username(email);
    let display_name = display_name_from_email(email);
    let mut attempt = 0u32;

    loop {
        let username = candidate_username(&base, attempt);
        let inserted = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, user_id, username, display_name)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET display_name = COALESCE(profiles.display_name, EXCLUDED.display_name)
            RETURNING id, user_id, username, display_name, background_url, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&username)
        .bind(&display_name)
        .fetch_one(pool)
        .await;

        match inserted {
            Ok(profile) => return Ok(profile),
            Err(e) if is_unique_violation(&e, "profiles_username_key") => attempt += 1,
            Err(e) => {
                tracing::error!("Failed to provision profile: {:?}", e);
                return Err(AppError::InternalServerError);
            }
        }
    }
}

/// Get the caller's profile
/// GET /profile
pub async fn get_profile(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let profile = ensure_profile(&pool, claims.sub, claims.email.as_deref()).await?;

    Ok(Json(json!({ "profile": profile })))
}

/// Sync the caller's profile with identity-provider data
/// POST /profile/sync
pub async fn sync_profile(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    ensure_profile(&pool, claims.sub, claims.email.as_deref()).await?;

    Ok(Json(json!({ "success": true })))
}

/// Change the caller's username
/// PUT /profile/username
pub async fn update_username(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<UpdateUsernameRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let username = payload.username.as_deref().unwrap_or("").trim();
    if username.len() < USERNAME_MIN_LEN {
        return Err(AppError::BadRequest(
            "Username must be at least 2 characters".to_string(),
        ));
    }
    if !is_valid_username(username) {
        return Err(AppError::BadRequest(
            "Username can only contain letters, numbers, and underscores".to_string(),
        ));
    }

    ensure_profile(&pool, claims.sub, claims.email.as_deref()).await?;

    let updated = sqlx::query_scalar::<_, String>(
        "UPDATE profiles SET username = $1, updated_at = NOW() WHERE user_id = $2 RETURNING username",
    )
    .bind(username)
    .bind(claims.sub)
    .fetch_one(&pool)
    .await
    .map_err(|e| {
        if is_unique_violation(&e, "profiles_username_key") {
            AppError::Conflict("Username is already taken".to_string())
        } else {
            tracing::error!("Failed to update username: {:?}", e);
            AppError::InternalServerError
        }
    })?;

    Ok(Json(json!({ "success": true, "username": updated })))
}

/// Change the caller's background image
/// PUT /profile/background
pub async fn update_background(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Json(payload): Json<UpdateBackgroundRequest>,
) -> Result<impl IntoResponse, AppError> {
    let background_url = payload
        .background_url
        .as_deref()
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .ok_or_else(|| AppError::BadRequest("backgroundUrl required".to_string()))?;

    ensure_profile(&pool, claims.sub, claims.email.as_deref()).await?;

    sqlx::query("UPDATE profiles SET background_url = $1, updated_at = NOW() WHERE user_id = $2")
        .bind(background_url)
        .bind(claims.sub)
        .execute(&pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update background: {:?}", e);
            AppError::InternalServerError
        })?;

    Ok(Json(json!({ "success": true })))
}

#[derive(FromRow)]
struct SearchRow {
    user_id: Uuid,
    username: String,
    display_name: Option<String>,
}

impl From<SearchRow> for UserSummary {
    fn from(row: SearchRow) -> Self {
        UserSummary {
            id: row.user_id,
            display_name: row.display_name.unwrap_or_else(|| row.username.clone()),
            username: row.username,
        }
    }
}

/// Search users by username, case-insensitive substring match
/// GET /users/search?username=...
pub async fn search_users(
    State(pool): State<PgPool>,
    claims: jwt::Claims,
    Query(query): Query<SearchQuery>,
) -> Result<impl IntoResponse, AppError> {
    query
        .validate()
        .map_err(|e| AppError::BadRequest(e.to_string()))?;

    let needle = query.username.as_deref().unwrap_or("").trim();
    if needle.len() < USERNAME_MIN_LEN {
        return Err(AppError::BadRequest(
            "Username query must be at least 2 characters".to_string(),
        ));
    }

    let rows = sqlx::query_as::<_, SearchRow>(
        r#"
        SELECT user_id, username, display_name
        FROM profiles
        WHERE LOWER(username) LIKE LOWER($1) AND user_id != $2
        ORDER BY username
        LIMIT 20
        "#,
    )
    .bind(format!("%{}%", needle))
    .bind(claims.sub)
    .fetch_all(&pool)
    .await
    .map_err(|e| {
        tracing::error!("User search failed: {:?}", e);
        AppError::InternalServerError
    })?;

    let users: Vec<UserSummary> = rows.into_iter().map(UserSummary::from).collect();

    Ok(Json(json!({ "users": users })))
}
