//! profile::http
//!
//! `ProfileClient` over a Graph-style REST profile service:
//! `GET {base}/me` for the profile and `GET {base}/me/photo/$value` for the
//! photo bytes.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};

use super::{ExtendedProfile, ProfileClient, ProfileError};
use crate::session::AvatarRef;

/// HTTP implementation of [`ProfileClient`].
#[derive(Debug, Clone)]
pub struct HttpProfileClient {
    client: Client,
    base_url: String,
}

impl HttpProfileClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProfileError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProfileError::Network(e.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get(&self, path: &str, access_token: &str) -> Result<reqwest::Response, ProfileError> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| ProfileError::Network(e.to_string()))
    }
}

fn api_error(status: StatusCode) -> ProfileError {
    ProfileError::Api {
        status: status.as_u16(),
        message: status.canonical_reason().unwrap_or("unknown").to_string(),
    }
}

#[async_trait]
impl ProfileClient for HttpProfileClient {
    async fn fetch_profile(&self, access_token: &str) -> Result<ExtendedProfile, ProfileError> {
        let response = self.get("/me", access_token).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(status));
        }
        response
            .json()
            .await
            .map_err(|e| ProfileError::Malformed(e.to_string()))
    }

    async fn fetch_avatar(&self, access_token: &str) -> Result<Option<AvatarRef>, ProfileError> {
        let response = self.get("/me/photo/$value", access_token).await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(api_error(status));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/jpeg")
            .to_string();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ProfileError::Network(e.to_string()))?;
        if bytes.is_empty() {
            return Ok(None);
        }
        Ok(Some(AvatarRef::from_image(&content_type, &bytes)))
    }
}
