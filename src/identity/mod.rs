//! identity
//!
//! The federated identity provider, seen from the bootstrap side.
//!
//! # Design
//!
//! The provider's own protocol is opaque here. What the orchestrator needs
//! is its current status (authenticated, cached accounts, whether a redirect
//! is still being processed) plus three capabilities: silent token
//! acquisition, redirect to login, and redirect to logout.
//!
//! Status reads are synchronous; they reflect provider state already held in
//! memory or on disk. Capabilities are async.

mod cached;
pub mod mock;

pub use cached::CachedIdentityClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from identity provider operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// No usable cached token; the user has to interact with the provider.
    #[error("interaction required: {0}")]
    InteractionRequired(String),

    /// The account is not known to the provider cache.
    #[error("no cached account '{0}'")]
    UnknownAccount(String),

    /// The provider cache could not be read or written.
    #[error("identity cache error: {0}")]
    Cache(String),

    /// A browser redirect could not be started.
    #[error("redirect failed: {0}")]
    Redirect(String),

    /// The provider is not configured.
    #[error("identity provider not configured: {0}")]
    NotConfigured(String),
}

/// An account cached by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderAccount {
    pub home_account_id: String,
    /// Directory object id.
    #[serde(alias = "localAccountId")]
    pub object_id: String,
    /// Sign-in name, usually the email.
    pub username: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Federated identity provider.
#[async_trait]
pub trait IdentityClient: Send + Sync {
    /// Whether the provider considers the user signed in.
    fn is_authenticated(&self) -> bool;

    /// Cached accounts, most recently used first.
    fn accounts(&self) -> Vec<ProviderAccount>;

    /// True while a redirect is still being processed.
    fn interaction_in_progress(&self) -> bool;

    /// Acquire an access token for `scopes` without user interaction.
    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &ProviderAccount,
    ) -> Result<String, IdentityError>;

    /// Send the user to the provider's sign-in page.
    async fn redirect_to_login(&self) -> Result<(), IdentityError>;

    /// End the provider session and return to `post_logout_uri`.
    async fn redirect_to_logout(&self, post_logout_uri: &str) -> Result<(), IdentityError>;
}

/// Stand-in used when no identity provider is configured: never signed in,
/// and every capability fails with `NotConfigured`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledIdentity;

#[async_trait]
impl IdentityClient for DisabledIdentity {
    fn is_authenticated(&self) -> bool {
        false
    }

    fn accounts(&self) -> Vec<ProviderAccount> {
        Vec::new()
    }

    fn interaction_in_progress(&self) -> bool {
        false
    }

    async fn acquire_token_silent(
        &self,
        _scopes: &[String],
        _account: &ProviderAccount,
    ) -> Result<String, IdentityError> {
        Err(IdentityError::NotConfigured("no identity provider".into()))
    }

    async fn redirect_to_login(&self) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured(
            "set identity.authority and identity.client_id".into(),
        ))
    }

    async fn redirect_to_logout(&self, _post_logout_uri: &str) -> Result<(), IdentityError> {
        Err(IdentityError::NotConfigured("no identity provider".into()))
    }
}
