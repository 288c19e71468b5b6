//! profile
//!
//! Best-effort profile enrichment from the directory's profile service.
//!
//! Nothing here is required for a session to resolve. Callers log failures
//! and carry on.

mod http;
pub mod mock;

pub use http::HttpProfileClient;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::session::AvatarRef;

/// Errors from the profile service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProfileError {
    #[error("profile request failed: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("malformed profile response: {0}")]
    Malformed(String),

    #[error("network error: {0}")]
    Network(String),
}

/// Extended profile as the profile service reports it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedProfile {
    #[serde(default, alias = "id")]
    pub object_id: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub mail: Option<String>,
    #[serde(default)]
    pub user_principal_name: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub employee_id: Option<String>,
}

impl ExtendedProfile {
    /// Best email: `mail`, then the principal name.
    pub fn email(&self) -> Option<&str> {
        self.mail
            .as_deref()
            .or(self.user_principal_name.as_deref())
            .filter(|s| !s.is_empty())
    }
}

/// Profile service operations. Both take a profile-scoped access token.
#[async_trait]
pub trait ProfileClient: Send + Sync {
    async fn fetch_profile(&self, access_token: &str) -> Result<ExtendedProfile, ProfileError>;

    /// The user's photo, or `None` if they have none.
    async fn fetch_avatar(&self, access_token: &str) -> Result<Option<AvatarRef>, ProfileError>;
}
