use anyhow::{anyhow, Result};
use axum::{extract::State, response::IntoResponse, Json};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::{auth::jwt, error::AppError};

/// Client for the external object store's signing endpoint. The store
/// accepts uploads against the returned token and later serves the
/// object at a public URL; nothing is stored in-process.
#[derive(Clone)]
pub struct StorageClient {
    http: Client,
    base_url: String,
    service_key: String,
    bucket: String,
}

/// A pre-signed upload slot.
#[derive(Debug, Serialize)]
pub struct SignedUpload {
    pub path: String,
    pub token: String,
    pub url: String,
}

#[derive(Debug, Deserialize)]
struct SignUploadBody {
    url: String,
}

impl StorageClient {
    pub fn new(base_url: &str, service_key: &str, bucket: &str) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key: service_key.to_string(),
            bucket: bucket.to_string(),
        }
    }

    /// Ask the object store for a pre-signed upload slot at `path`.
    pub async fn create_signed_upload_url(&self, path: &str) -> Result<SignedUpload> {
        let endpoint = format!(
            "{}/storage/v1/object/upload/sign/{}/{}",
            self.base_url, self.bucket, path
        );

        let response = self
            .http
            .post(&endpoint)
            .bearer_auth(&self.service_key)
            .json(&serde_json::json!({}))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "storage signing failed with status {}",
                response.status()
            ));
        }

        let body: SignUploadBody = response.json().await?;
        let token = token_from_signed_url(&body.url)
            .ok_or_else(|| anyhow!("signed upload response carried no token"))?
            .to_string();

        Ok(SignedUpload {
            path: path.to_string(),
            token,
            url: format!("{}/storage/v1{}", self.base_url, body.url),
        })
    }
}

fn token_from_signed_url(url: &str) -> Option<&str> {
    url.split_once("token=").map(|(_, token)| token)
}

/// Reserve an upload slot for the caller's next check-in photo
/// POST /uploads/sign
pub async fn sign_upload(
    State(storage): State<StorageClient>,
    claims: jwt::Claims,
) -> Result<impl IntoResponse, AppError> {
    let path = format!(
        "checkins/{}/{}.jpg",
        claims.sub,
        chrono::Utc::now().timestamp_millis()
    );

    let signed = storage.create_signed_upload_url(&path).await.map_err(|e| {
        tracing::error!("Failed to sign upload: {:?}", e);
        AppError::InternalServerError
    })?;

    Ok(Json(signed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_token_from_signed_url() {
        let url = "/object/upload/sign/checkin-photos/checkins/u/1.jpg?token=abc123";
        assert_eq!(token_from_signed_url(url), Some("abc123"));
    }

    #[test]
    fn missing_token_is_none() {
        assert_eq!(token_from_signed_url("/object/upload/sign/x"), None);
    }
}
