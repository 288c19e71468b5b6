//! identity::cached
//!
//! `IdentityClient` over the provider's on-disk token cache.
//!
//! # Cache file
//!
//! JSON, written by whatever completes the provider redirect:
//!
//! ```json
//! {
//!   "accounts": [{"homeAccountId": "h", "objectId": "o", "username": "a@example.com"}],
//!   "tokens": [{"homeAccountId": "h", "scopes": ["User.Read"],
//!               "secret": "...", "expiresAt": "2026-01-01T00:00:00Z"}],
//!   "interactionInProgress": false
//! }
//! ```
//!
//! Cached tokens are handed out only while more than five minutes of their
//! lifetime remain. Redirects open the system browser.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use super::{IdentityClient, IdentityError, ProviderAccount};
use crate::core::config::IdentityConfig;

/// Tokens this close to expiry are treated as expired.
pub const EXPIRY_BUFFER_SECS: i64 = 300;

/// Opens a URL in the user's browser.
pub type UrlOpener = Arc<dyn Fn(&str) -> std::io::Result<()> + Send + Sync>;

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CacheFile {
    #[serde(default)]
    accounts: Vec<ProviderAccount>,
    #[serde(default)]
    tokens: Vec<CachedToken>,
    #[serde(default)]
    interaction_in_progress: bool,
}

#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CachedToken {
    home_account_id: String,
    scopes: Vec<String>,
    secret: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn covers(&self, scopes: &[String]) -> bool {
        scopes
            .iter()
            .all(|wanted| self.scopes.iter().any(|s| s.eq_ignore_ascii_case(wanted)))
    }

    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now + Duration::seconds(EXPIRY_BUFFER_SECS) < self.expires_at
    }
}

impl std::fmt::Debug for CachedToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedToken")
            .field("home_account_id", &self.home_account_id)
            .field("scopes", &self.scopes)
            .field("secret", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Identity client backed by a token cache file.
pub struct CachedIdentityClient {
    authority: String,
    client_id: String,
    redirect_uri: Option<String>,
    login_scopes: Vec<String>,
    cache_path: PathBuf,
    cache: Mutex<CacheFile>,
    opener: UrlOpener,
}

impl std::fmt::Debug for CachedIdentityClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CachedIdentityClient")
            .field("authority", &self.authority)
            .field("client_id", &self.client_id)
            .field("cache_path", &self.cache_path)
            .finish_non_exhaustive()
    }
}

impl CachedIdentityClient {
    /// Build from the `[identity]` config section.
    ///
    /// # Errors
    ///
    /// `NotConfigured` if `authority` or `client_id` is missing, `Cache` if
    /// an existing cache file cannot be parsed.
    pub fn from_config(config: &IdentityConfig) -> Result<Self, IdentityError> {
        let authority = config
            .authority
            .clone()
            .ok_or_else(|| IdentityError::NotConfigured("identity.authority is not set".into()))?;
        let client_id = config
            .client_id
            .clone()
            .ok_or_else(|| IdentityError::NotConfigured("identity.client_id is not set".into()))?;
        let cache_path = match &config.cache_path {
            Some(path) => path.clone(),
            None => default_cache_path()?,
        };

        let mut client = Self::new(authority, client_id, cache_path)?;
        client.redirect_uri = config.redirect_uri.clone();
        if let Some(scopes) = &config.api_scopes {
            client.login_scopes = scopes.clone();
        }
        Ok(client)
    }

    /// Create a client over `cache_path`, loading it if present.
    pub fn new(
        authority: impl Into<String>,
        client_id: impl Into<String>,
        cache_path: impl Into<PathBuf>,
    ) -> Result<Self, IdentityError> {
        let cache_path = cache_path.into();
        let cache = read_cache(&cache_path)?;
        Ok(Self {
            authority: authority.into().trim_end_matches('/').to_string(),
            client_id: client_id.into(),
            redirect_uri: None,
            login_scopes: vec!["openid".into(), "profile".into()],
            cache_path,
            cache: Mutex::new(cache),
            opener: Arc::new(|url: &str| open::that(url)),
        })
    }

    /// Replace the browser opener.
    pub fn with_opener(mut self, opener: UrlOpener) -> Self {
        self.opener = opener;
        self
    }

    pub fn cache_path(&self) -> &Path {
        &self.cache_path
    }

    /// Re-read the cache file.
    pub fn reload(&self) -> Result<(), IdentityError> {
        let fresh = read_cache(&self.cache_path)?;
        *self.lock() = fresh;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, CacheFile> {
        self.cache.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn endpoint(&self, path: &str, params: &[(&str, &str)]) -> Result<String, IdentityError> {
        let base = format!("{}/oauth2/v2.0/{}", self.authority, path);
        reqwest::Url::parse_with_params(&base, params)
            .map(String::from)
            .map_err(|e| IdentityError::Redirect(format!("invalid authority URL: {}", e)))
    }

    fn open(&self, url: &str) -> Result<(), IdentityError> {
        tracing::info!(url, "opening identity provider");
        (self.opener)(url).map_err(|e| IdentityError::Redirect(e.to_string()))
    }
}

fn default_cache_path() -> Result<PathBuf, IdentityError> {
    dirs::home_dir()
        .map(|home| home.join(".latchkey").join("identity-cache.json"))
        .ok_or_else(|| IdentityError::Cache("home directory not found".into()))
}

fn read_cache(path: &Path) -> Result<CacheFile, IdentityError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents)
            .map_err(|e| IdentityError::Cache(format!("{}: {}", path.display(), e))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CacheFile::default()),
        Err(e) => Err(IdentityError::Cache(format!("{}: {}", path.display(), e))),
    }
}

#[async_trait]
impl IdentityClient for CachedIdentityClient {
    fn is_authenticated(&self) -> bool {
        !self.lock().accounts.is_empty()
    }

    fn accounts(&self) -> Vec<ProviderAccount> {
        self.lock().accounts.clone()
    }

    fn interaction_in_progress(&self) -> bool {
        self.lock().interaction_in_progress
    }

    async fn acquire_token_silent(
        &self,
        scopes: &[String],
        account: &ProviderAccount,
    ) -> Result<String, IdentityError> {
        let cache = self.lock();
        if !cache
            .accounts
            .iter()
            .any(|a| a.home_account_id == account.home_account_id)
        {
            return Err(IdentityError::UnknownAccount(account.username.clone()));
        }

        let now = Utc::now();
        cache
            .tokens
            .iter()
            .filter(|t| t.home_account_id == account.home_account_id && t.covers(scopes))
            .find(|t| t.is_fresh(now))
            .map(|t| t.secret.clone())
            .ok_or_else(|| {
                IdentityError::InteractionRequired(format!(
                    "no fresh token for scopes [{}]",
                    scopes.join(" ")
                ))
            })
    }

    async fn redirect_to_login(&self) -> Result<(), IdentityError> {
        let scope = self.login_scopes.join(" ");
        let mut params = vec![
            ("client_id", self.client_id.as_str()),
            ("response_type", "code"),
            ("scope", scope.as_str()),
        ];
        if let Some(redirect_uri) = &self.redirect_uri {
            params.push(("redirect_uri", redirect_uri.as_str()));
        }
        let url = self.endpoint("authorize", &params)?;
        self.open(&url)
    }

    async fn redirect_to_logout(&self, post_logout_uri: &str) -> Result<(), IdentityError> {
        match std::fs::remove_file(&self.cache_path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(IdentityError::Cache(e.to_string())),
        }
        *self.lock() = CacheFile::default();

        let url = self.endpoint(
            "logout",
            &[("post_logout_redirect_uri", post_logout_uri)],
        )?;
        self.open(&url)
    }
}
