//! backend::http
//!
//! `SessionBackend` over the backend's JSON API.
//!
//! | Operation | Request |
//! |---|---|
//! | validate | `GET /api/auth/me` with `Authorization: Bearer <token>` |
//! | exchange | `POST /api/auth/federated/exchange` `{federatedToken, objectId, email, name}` |
//! | login | `POST /api/auth/login` `{email, password}` |
//!
//! Exchange and login answer `{token, user}`. A user body may be bare or
//! wrapped as `{"user": {...}}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use super::{BackendError, ExchangeRequest, SessionBackend};
use crate::session::user::WireUser;
use crate::session::{LocalSession, UserRecord};

/// User-Agent header value for backend requests.
const USER_AGENT_VALUE: &str = concat!("latchkey/", env!("CARGO_PKG_VERSION"));

/// HTTP implementation of [`SessionBackend`].
#[derive(Debug, Clone)]
pub struct HttpSessionBackend {
    client: Client,
    base_url: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ExchangeBody<'a> {
    federated_token: &'a str,
    object_id: &'a str,
    email: &'a str,
    name: &'a str,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct SessionResponse {
    token: Option<String>,
    user: Option<WireUser>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UserResponse {
    Wrapped { user: WireUser },
    Bare(WireUser),
}

#[derive(Deserialize)]
struct ErrorResponse {
    #[serde(alias = "error")]
    message: String,
}

impl HttpSessionBackend {
    /// Create a backend client rooted at `base_url`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BackendError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Response, BackendError> {
        let request_id = Self::request_id();
        tracing::debug!(%request_id, "backend request");
        request
            .header("X-Request-Id", request_id)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))
    }

    async fn error_message(response: Response) -> String {
        let status = response.status();
        match response.json::<ErrorResponse>().await {
            Ok(body) => body.message,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string(),
        }
    }

    async fn read_session(response: Response) -> Result<LocalSession, BackendError> {
        let body: SessionResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        let token = body
            .token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BackendError::Malformed("response has no token".into()))?;
        let wire = body
            .user
            .ok_or_else(|| BackendError::Malformed("response has no user".into()))?;
        let user = UserRecord::from_wire(wire).map_err(|e| BackendError::Malformed(e.to_string()))?;
        Ok(LocalSession::new(token, user))
    }
}

#[async_trait]
impl SessionBackend for HttpSessionBackend {
    async fn validate_local_token(&self, token: &str) -> Result<UserRecord, BackendError> {
        let response = self
            .send(self.client.get(self.url("/api/auth/me")).bearer_auth(token))
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::InvalidToken(status.as_u16()));
        }

        let body: UserResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Malformed(e.to_string()))?;
        let wire = match body {
            UserResponse::Wrapped { user } => user,
            UserResponse::Bare(user) => user,
        };
        UserRecord::from_wire(wire).map_err(|e| BackendError::Malformed(e.to_string()))
    }

    async fn exchange_federated_token(
        &self,
        request: &ExchangeRequest,
    ) -> Result<LocalSession, BackendError> {
        let body = ExchangeBody {
            federated_token: &request.federated_token,
            object_id: &request.object_id,
            email: &request.email,
            name: &request.name,
        };
        let response = self
            .send(
                self.client
                    .post(self.url("/api/auth/federated/exchange"))
                    .json(&body),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::ExchangeFailed {
                status: status.as_u16(),
                message: Self::error_message(response).await,
            });
        }
        Self::read_session(response).await
    }

    async fn login_local(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LocalSession, BackendError> {
        let response = self
            .send(
                self.client
                    .post(self.url("/api/auth/login"))
                    .json(&LoginBody { email, password }),
            )
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = match status {
                StatusCode::UNAUTHORIZED => "invalid email or password".to_string(),
                _ => Self::error_message(response).await,
            };
            return Err(BackendError::LoginRejected {
                status: status.as_u16(),
                message,
            });
        }
        Self::read_session(response).await
    }
}
