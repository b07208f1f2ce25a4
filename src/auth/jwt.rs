use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
    RequestPartsExt,
};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    TypedHeader,
};
use jsonwebtoken::{decode, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{config::settings::Settings, error::AppError};

/// Claims of an access token issued by the identity provider.
/// `sub` is the stable user id every row in the database keys on.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: Option<String>,
    pub aud: String,
    pub exp: i64,
    pub iat: i64,
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let mut validation = Validation::default();
    validation.set_audience(&["authenticated"]);

    let data = decode::<Claims>(token, &DecodingKey::from_secret(secret.as_ref()), &validation)?;
    Ok(data.claims)
}

#[async_trait]
impl<S> FromRequestParts<S> for Claims
where
    S: Send + Sync,
    Settings: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) = parts
            .extract::<TypedHeader<Authorization<Bearer>>>()
            .await
            .map_err(|_| AppError::Unauthorized)?;

        let settings = Settings::from_ref(state);

        decode_token(bearer.token(), &settings.jwt_secret).map_err(|_| AppError::Unauthorized)
    }
}

#[cfg(test)]
pub fn create_token(user_id: Uuid, email: Option<&str>, secret: &str) -> anyhow::Result<String> {
    use jsonwebtoken::{encode, EncodingKey, Header};

    let now = chrono::Utc::now();
    let claims = Claims {
        sub: user_id,
        email: email.map(str::to_string),
        aud: "authenticated".to_string(),
        exp: (now + chrono::Duration::hours(1)).timestamp(),
        iat: now.timestamp(),
    };
    Ok(encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_round_trip() {
        let user_id = Uuid::new_v4();
        let token = create_token(user_id, Some("sam@example.com"), "secret").unwrap();
        let claims = decode_token(&token, "secret").unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.email.as_deref(), Some("sam@example.com"));
        assert_eq!(claims.aud, "authenticated");
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = create_token(Uuid::new_v4(), None, "secret").unwrap();
        assert!(decode_token(&token, "other").is_err());
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(decode_token("not-a-jwt", "secret").is_err());
    }
}
