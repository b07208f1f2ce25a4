use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

pub mod handler;

pub const USERNAME_MIN_LEN: usize = 2;

/// Database model for a user's profile. One row per identity-provider
/// user, provisioned lazily on first profile-dependent request.
#[derive(Debug, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub username: String,
    pub display_name: Option<String>,
    pub background_url: Option<String>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateUsernameRequest {
    #[validate(length(min = 2, message = "Username must be at least 2 characters"))]
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBackgroundRequest {
    pub background_url: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SearchQuery {
    #[validate(length(min = 2, message = "Username query must be at least 2 characters"))]
    pub username: Option<String>,
}

/// Public listing of a user, as returned by search.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

pub fn is_valid_username(username: &str) -> bool {
    username.len() >= USERNAME_MIN_LEN
        && username
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Starting username candidate, derived from the identity provider's
/// email local-part restricted to the username charset.
pub fn base_username(email: Option<&str>) -> String {
    let local = email.and_then(|e| e.split('@').next()).unwrap_or("");
    let cleaned: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .collect();
    if cleaned.len() >= USERNAME_MIN_LEN {
        cleaned
    } else {
        "user".to_string()
    }
}

/// Nth candidate in the collision-avoidance sequence: base, base1, base2, ...
pub fn candidate_username(base: &str, attempt: u32) -> String {
    if attempt == 0 {
        base.to_string()
    } else {
        format!("{}{}", base, attempt)
    }
}

pub fn display_name_from_email(email: Option<&str>) -> String {
    email
        .and_then(|e| e.split('@').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("User")
        .to_string()
}

/// Display fallback for users whose profile has no display name.
pub fn fallback_display_name(user_id: &Uuid) -> String {
    format!("User {}", &user_id.to_string()[..8])
}

/// Username fallback for users with no profile row (follow edges can
/// predate provisioning).
pub fn fallback_username(user_id: &Uuid) -> String {
    format!("user_{}", &user_id.to_string()[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_validation() {
        assert!(is_valid_username("sam_1"));
        assert!(is_valid_username("AB"));
        assert!(!is_valid_username("a"));
        assert!(!is_valid_username("has space"));
        assert!(!is_valid_username("dot.ted"));
        assert!(!is_valid_username(""));
    }

    #[test]
    fn base_username_from_email() {
        assert_eq!(base_username(Some("sam@example.com")), "sam");
        assert_eq!(base_username(Some("sam.jones+x@example.com")), "samjonesx");
        assert_eq!(base_username(Some("a@example.com")), "user");
        assert_eq!(base_username(None), "user");
    }

    #[test]
    fn candidate_sequence_appends_suffix() {
        assert_eq!(candidate_username("sam", 0), "sam");
        assert_eq!(candidate_username("sam", 1), "sam1");
        assert_eq!(candidate_username("sam", 7), "sam7");
    }

    #[test]
    fn display_name_defaults() {
        assert_eq!(display_name_from_email(Some("sam@example.com")), "sam");
        assert_eq!(display_name_from_email(None), "User");
    }

    #[test]
    fn fallbacks_use_first_eight_chars_of_id() {
        let id: Uuid = "0f4b2a1c-9d8e-4f00-a111-222233334444".parse().unwrap();
        assert_eq!(fallback_display_name(&id), "User 0f4b2a1c");
        assert_eq!(fallback_username(&id), "user_0f4b2a1c");
    }
}
