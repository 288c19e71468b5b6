//! Explicit sign-in: local password login and the federated redirect.

use super::{lock, Orchestrator};
use crate::session::credentials::fingerprint;
use crate::session::errors::SessionError;
use crate::session::state::{AuthState, Resolution, RunTicket, UnauthenticatedReason};
use crate::session::user::{AuthSource, UserRecord};
use crate::session::LocalSession;

impl Orchestrator {
    /// Sign in with email and password.
    ///
    /// Clears a pending logged-out flag and any sticky reason; the user asked
    /// to sign in.
    ///
    /// # Errors
    ///
    /// `Busy` if a bootstrap run is in flight, `LoginFailed` if the backend
    /// rejects the credentials, `CredentialStore` if the session cannot be
    /// persisted.
    pub async fn login_local(&self, email: &str, password: &str) -> Result<UserRecord, SessionError> {
        let prior = self.writer.snapshot();
        let Some(ticket) = self.writer.claim() else {
            return Err(SessionError::Busy);
        };

        let session = match self.backend.login_local(email, password).await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "local login rejected");
                self.restore(ticket, &prior);
                return Err(SessionError::LoginFailed(e.to_string()));
            }
        };

        if let Err(e) = self.credentials.save_session(&session) {
            self.restore(ticket, &prior);
            return Err(e.into());
        }
        if let Err(e) = self.credentials.clear_logged_out() {
            tracing::warn!(error = %e, "cannot clear logged-out flag");
        }

        tracing::info!(
            user = %session.user.id,
            token = %fingerprint(&session.token),
            "signed in with password"
        );
        let user = session.user.clone();
        self.writer.resolve(ticket, Resolution::Authenticated(session));
        if user.auth_source() == AuthSource::Federated {
            self.start_enrichment(user.origin.object_id());
        }

        let route = self.navigator.current_route();
        *lock(&self.last_trigger) = Some(self.observe(&route));
        Ok(user)
    }

    /// Start an interactive sign-in with the identity provider.
    ///
    /// The next run after the provider redirects back resolves through the
    /// federated exchange.
    pub async fn begin_federated_login(&self) -> Result<(), SessionError> {
        self.writer.clear_sticky_reason();
        if let Err(e) = self.credentials.clear_logged_out() {
            tracing::warn!(error = %e, "cannot clear logged-out flag");
        }
        lock(&self.last_trigger).take();

        self.identity
            .redirect_to_login()
            .await
            .map_err(|e| SessionError::LoginFailed(e.to_string()))
    }

    /// Put back the state a failed login interrupted.
    fn restore(&self, ticket: RunTicket, prior: &AuthState) {
        let resolution = match (&prior.token, &prior.user) {
            (Some(token), Some(user)) if prior.is_authenticated() => {
                Resolution::Authenticated(LocalSession::new(token.clone(), user.clone()))
            }
            _ => Resolution::Unauthenticated(
                prior.reason.unwrap_or(UnauthenticatedReason::NoCredentials),
            ),
        };
        self.writer.resolve(ticket, resolution);
    }
}
