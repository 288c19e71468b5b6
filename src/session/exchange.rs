//! session::exchange
//!
//! The federated exchange sequence.
//!
//! # Steps
//!
//! 1. Acquire an API-scoped token silently.
//! 2. Best effort: acquire a profile-scoped token and fetch the extended
//!    profile. Failures are logged and dropped.
//! 3. Exchange the API token, plus the best identity fields available, for a
//!    local session.
//!
//! All steps share one [`CancellationToken`]. A [`Deadline`] cancels it when
//! the time budget runs out; shutdown and logout cancel it through its
//! parent. Once the token fires no further step starts, and the step in
//! progress is abandoned.

use std::future::Future;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::credentials::LocalSession;
use super::errors::SessionError;
use crate::backend::{ExchangeRequest, SessionBackend};
use crate::identity::{IdentityClient, ProviderAccount};
use crate::profile::{ExtendedProfile, ProfileClient};

/// Run `fut` unless `cancel` fires first. `None` means cancelled.
pub(crate) async fn guarded<F: Future>(cancel: &CancellationToken, fut: F) -> Option<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => None,
        out = fut => Some(out),
    }
}

/// Cancels a token once a budget elapses. Dropping it stops the timer.
#[derive(Debug)]
pub(crate) struct Deadline {
    timer: JoinHandle<()>,
}

impl Deadline {
    pub(crate) fn start(cancel: &CancellationToken, budget: Duration) -> Self {
        let cancel = cancel.clone();
        let timer = tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep(budget) => {
                    tracing::debug!(?budget, "exchange budget exhausted");
                    cancel.cancel();
                }
                _ = cancel.cancelled() => {}
            }
        });
        Self { timer }
    }
}

impl Drop for Deadline {
    fn drop(&mut self) {
        self.timer.abort();
    }
}

/// Identity fields sent with the exchange, best source first.
pub(crate) fn exchange_request(
    federated_token: String,
    account: &ProviderAccount,
    profile: Option<&ExtendedProfile>,
) -> ExchangeRequest {
    let from_profile = |f: fn(&ExtendedProfile) -> Option<&str>| {
        profile.and_then(f).filter(|s| !s.is_empty()).map(str::to_string)
    };
    let object_id = from_profile(|p| p.object_id.as_deref())
        .or_else(|| Some(account.object_id.clone()).filter(|s| !s.is_empty()))
        .unwrap_or_default();
    let email = from_profile(ExtendedProfile::email)
        .or_else(|| Some(account.username.clone()).filter(|s| !s.is_empty()))
        .unwrap_or_default();
    let name = from_profile(|p| p.display_name.as_deref())
        .or_else(|| account.name.clone().filter(|s| !s.is_empty()))
        .unwrap_or_default();

    ExchangeRequest {
        federated_token,
        object_id,
        email,
        name,
    }
}

/// Step failure, before it is classified.
#[derive(Debug)]
pub(crate) enum StepError {
    /// The shared token fired.
    Cancelled,
    Failed(SessionError),
}

/// One federated exchange attempt.
pub(crate) struct ExchangeSequence<'a> {
    pub identity: &'a dyn IdentityClient,
    pub backend: &'a dyn SessionBackend,
    pub profile: Option<&'a dyn ProfileClient>,
    pub api_scopes: &'a [String],
    pub profile_scopes: &'a [String],
}

impl ExchangeSequence<'_> {
    pub(crate) async fn run(
        &self,
        account: &ProviderAccount,
        cancel: &CancellationToken,
    ) -> Result<LocalSession, StepError> {
        let api_token = guarded(
            cancel,
            self.identity.acquire_token_silent(self.api_scopes, account),
        )
        .await
        .ok_or(StepError::Cancelled)?
        .map_err(|e| StepError::Failed(SessionError::TokenAcquisitionFailed(e.to_string())))?;
        tracing::debug!("acquired API token");

        let profile = self.fetch_profile(account, cancel).await?;

        if cancel.is_cancelled() {
            return Err(StepError::Cancelled);
        }
        let request = exchange_request(api_token, account, profile.as_ref());
        tracing::debug!(object_id = %request.object_id, "exchanging federated token");

        guarded(cancel, self.backend.exchange_federated_token(&request))
            .await
            .ok_or(StepError::Cancelled)?
            .map_err(|e| StepError::Failed(SessionError::ExchangeFailed(e.to_string())))
    }

    /// Step 2. Only cancellation is an error here.
    async fn fetch_profile(
        &self,
        account: &ProviderAccount,
        cancel: &CancellationToken,
    ) -> Result<Option<ExtendedProfile>, StepError> {
        let Some(profile) = self.profile else {
            return Ok(None);
        };

        let token = match guarded(
            cancel,
            self.identity.acquire_token_silent(self.profile_scopes, account),
        )
        .await
        {
            None => return Err(StepError::Cancelled),
            Some(Ok(token)) => token,
            Some(Err(e)) => {
                let err = SessionError::ProfileEnrichmentFailed(e.to_string());
                tracing::warn!(error = %err, "skipping profile lookup");
                return Ok(None);
            }
        };

        match guarded(cancel, profile.fetch_profile(&token)).await {
            None => Err(StepError::Cancelled),
            Some(Ok(extended)) => Ok(Some(extended)),
            Some(Err(e)) => {
                let err = SessionError::ProfileEnrichmentFailed(e.to_string());
                tracing::warn!(error = %err, "skipping profile lookup");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::mock::account;

    #[test]
    fn request_prefers_profile_fields() {
        let profile = ExtendedProfile {
            object_id: Some("profile-oid".into()),
            display_name: Some("Dana Profile".into()),
            mail: Some("dana@corp.example.com".into()),
            ..Default::default()
        };
        let request = exchange_request("t".into(), &account("dana"), Some(&profile));

        assert_eq!(request.object_id, "profile-oid");
        assert_eq!(request.email, "dana@corp.example.com");
        assert_eq!(request.name, "Dana Profile");
    }

    #[test]
    fn request_falls_back_to_account() {
        let request = exchange_request("t".into(), &account("dana"), None);

        assert_eq!(request.object_id, "oid-dana");
        assert_eq!(request.email, "dana@example.com");
        assert_eq!(request.name, "dana");
    }

    #[test]
    fn request_falls_back_to_empty() {
        let bare = ProviderAccount {
            home_account_id: "h".into(),
            object_id: String::new(),
            username: String::new(),
            name: None,
        };
        let request = exchange_request("t".into(), &bare, Some(&ExtendedProfile::default()));

        assert_eq!(request.object_id, "");
        assert_eq!(request.email, "");
        assert_eq!(request.name, "");
    }

    #[test]
    fn principal_name_used_when_mail_missing() {
        let profile = ExtendedProfile {
            user_principal_name: Some("dana@tenant.example.com".into()),
            ..Default::default()
        };
        let request = exchange_request("t".into(), &account("dana"), Some(&profile));
        assert_eq!(request.email, "dana@tenant.example.com");
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_cancels_token() {
        let cancel = CancellationToken::new();
        let _deadline = Deadline::start(&cancel, Duration::from_secs(10));

        let out = guarded(&cancel, tokio::time::sleep(Duration::from_secs(60))).await;

        assert!(out.is_none());
        assert!(cancel.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn guarded_returns_output_before_deadline() {
        let cancel = CancellationToken::new();
        let _deadline = Deadline::start(&cancel, Duration::from_secs(10));

        let out = guarded(&cancel, async { 7 }).await;

        assert_eq!(out, Some(7));
        assert!(!cancel.is_cancelled());
    }
}
