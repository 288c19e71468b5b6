//! session::enrichment
//!
//! Background avatar enrichment for federated sessions.
//!
//! Runs after a session has resolved and never influences resolution. Its
//! only write is through an [`AvatarPatcher`], which drops the patch if the
//! session it was issued for is gone.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::errors::SessionError;
use super::exchange::guarded;
use super::state::AvatarPatcher;
use crate::identity::{IdentityClient, ProviderAccount};
use crate::profile::ProfileClient;

/// Pick the provider account for a directory object id, falling back to the
/// most recent one.
pub(crate) fn pick_account(
    accounts: Vec<ProviderAccount>,
    object_id: Option<&str>,
) -> Option<ProviderAccount> {
    let matching = object_id.and_then(|oid| accounts.iter().position(|a| a.object_id == oid));
    accounts.into_iter().nth(matching.unwrap_or(0))
}

pub(crate) struct AvatarEnrichment {
    pub identity: Arc<dyn IdentityClient>,
    pub profile: Arc<dyn ProfileClient>,
    pub scopes: Vec<String>,
    pub account: ProviderAccount,
    pub patcher: AvatarPatcher,
}

impl AvatarEnrichment {
    /// Run in the background until done or `cancel` fires.
    pub(crate) fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let user_id = self.patcher.user_id().to_string();
            match guarded(&cancel, self.run()).await {
                None => tracing::debug!(%user_id, "avatar enrichment cancelled"),
                Some(Ok(true)) => tracing::debug!(%user_id, "avatar updated"),
                Some(Ok(false)) => tracing::debug!(%user_id, "avatar unchanged"),
                Some(Err(e)) => tracing::warn!(%user_id, error = %e, "avatar enrichment failed"),
            }
        })
    }

    async fn run(&self) -> Result<bool, SessionError> {
        let token = self
            .identity
            .acquire_token_silent(&self.scopes, &self.account)
            .await
            .map_err(|e| SessionError::ProfileEnrichmentFailed(e.to_string()))?;
        let avatar = self
            .profile
            .fetch_avatar(&token)
            .await
            .map_err(|e| SessionError::ProfileEnrichmentFailed(e.to_string()))?;
        Ok(match avatar {
            Some(avatar) => self.patcher.patch(avatar),
            None => false,
        })
    }
}
