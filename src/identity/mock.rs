//! identity::mock
//!
//! Mock identity provider for deterministic testing.
//!
//! Status flags can be flipped mid-test to simulate the provider finishing a
//! redirect or signing out elsewhere.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{IdentityClient, IdentityError, ProviderAccount};

/// Mock identity provider. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockIdentity {
    inner: Arc<Mutex<MockIdentityInner>>,
}

#[derive(Debug, Default)]
struct MockIdentityInner {
    authenticated: bool,
    accounts: Vec<ProviderAccount>,
    interaction_in_progress: bool,
    /// Scope key (scopes joined by a space) -> token result.
    tokens: HashMap<String, Result<String, IdentityError>>,
    token_delay: Option<Duration>,
    fail_logout: Option<IdentityError>,
    operations: Vec<MockOperation>,
}

/// Recorded identity call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    AcquireToken { scopes: Vec<String>, account: String },
    RedirectToLogin,
    RedirectToLogout { post_logout_uri: String },
}

/// A provider account with predictable ids derived from `name`.
pub fn account(name: &str) -> ProviderAccount {
    ProviderAccount {
        home_account_id: format!("home-{}", name),
        object_id: format!("oid-{}", name),
        username: format!("{}@example.com", name),
        name: Some(name.to_string()),
    }
}

fn scope_key(scopes: &[String]) -> String {
    scopes.join(" ")
}

impl MockIdentity {
    /// A provider with no session.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockIdentityInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A provider that completed a redirect for `account`.
    pub fn signed_in(account: ProviderAccount) -> Self {
        let mock = Self::new();
        {
            let mut inner = mock.lock();
            inner.authenticated = true;
            inner.accounts.push(account);
        }
        mock
    }

    /// Answer silent acquisition for exactly `scopes` with `token`.
    pub fn with_token(self, scopes: &[String], token: impl Into<String>) -> Self {
        self.lock()
            .tokens
            .insert(scope_key(scopes), Ok(token.into()));
        self
    }

    /// Fail silent acquisition for exactly `scopes`.
    pub fn fail_token(self, scopes: &[String], err: IdentityError) -> Self {
        self.lock().tokens.insert(scope_key(scopes), Err(err));
        self
    }

    /// Delay every silent acquisition.
    pub fn with_token_delay(self, delay: Duration) -> Self {
        self.lock().token_delay = Some(delay);
        self
    }

    /// Fail redirect-logout.
    pub fn fail_logout(self, err: IdentityError) -> Self {
        self.lock().fail_logout = Some(err);
        self
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        self.lock().authenticated = authenticated;
    }

    pub fn set_accounts(&self, accounts: Vec<ProviderAccount>) {
        self.lock().accounts = accounts;
    }

    pub fn set_interaction_in_progress(&self, in_progress: bool) {
        self.lock().interaction_in_progress = in_progress;
    }

    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    pub fn token_calls(&self) -> usize {
        self.lock()
            .operations
            .iter()
            .filter(|op| matches!(op, MockOperation::AcquireToken { .. }))
            .count()
    }

    pub fn logout_redirects(&self) -> Vec<String> {
        self.lock()
            .operations
            .iter()
            .filter_map(|op| match op {
                MockOperation::RedirectToLogout { post_logout_uri } => {
                    Some(post_logout_uri.clone())
                }
                _ => None,
            })
            .collect()
    }
}

#[async_trait]
impl IdentityClient for MockIdentity {
    fn is_authenticated(&self) -> bool {
        self.lock().authenticated
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
        let (delay, result) = {
            let mut inner = self.lock();
            inner.operations.push(MockOperation::AcquireToken {
                scopes: scopes.to_vec(),
                account: account.home_account_id.clone(),
            });
            let result = inner
                .tokens
                .get(&scope_key(scopes))
                .cloned()
                .unwrap_or_else(|| {
                    Err(IdentityError::InteractionRequired(format!(
                        "no token for [{}]",
                        scope_key(scopes)
                    )))
                });
            (inner.token_delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn redirect_to_login(&self) -> Result<(), IdentityError> {
        self.lock().operations.push(MockOperation::RedirectToLogin);
        Ok(())
    }

    async fn redirect_to_logout(&self, post_logout_uri: &str) -> Result<(), IdentityError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::RedirectToLogout {
            post_logout_uri: post_logout_uri.to_string(),
        });
        match inner.fail_logout.clone() {
            Some(err) => Err(err),
            None => {
                inner.authenticated = false;
                inner.accounts.clear();
                Ok(())
            }
        }
    }
}
