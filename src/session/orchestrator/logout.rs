//! Logout.
//!
//! Steps run in order and each is best effort: a failure is logged and the
//! next step still runs. The logged-out flag is written before anything
//! else so that even a logout that dies halfway suppresses silent sign-in
//! on the next load.
//!
//! Logout never contacts the backend. Which provider to end a session with
//! comes from the published state, then the saved user record, then
//! whether the identity provider still holds an account.

use super::{lock, Orchestrator};
use crate::session::user::AuthSource;

/// How logout left the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutOutcome {
    /// Sent to the identity provider to end its session too.
    RedirectedToProvider,
    /// Sent straight to the login route.
    NavigatedToLogin,
}

impl Orchestrator {
    /// Log out.
    pub async fn logout(&self) -> LogoutOutcome {
        if let Err(e) = self.credentials.mark_logged_out() {
            tracing::error!(error = %e, "cannot record logout");
        }

        if let Some(cancel) = lock(&self.exchange_cancel).take() {
            cancel.cancel();
        }
        let source = self.logout_source();
        self.writer.sign_out();
        self.run_logout_hooks();

        if let Err(e) = self.credentials.clear_session() {
            tracing::error!(error = %e, "cannot clear local session");
        }
        tracing::info!(source = ?source, "signed out");

        if source == AuthSource::Federated {
            let uri = &self.settings.post_logout_redirect_uri;
            match self.identity.redirect_to_logout(uri).await {
                Ok(()) => return LogoutOutcome::RedirectedToProvider,
                Err(e) => tracing::warn!(error = %e, "provider logout failed"),
            }
        }

        self.navigator.navigate(self.settings.routes.login_route());
        LogoutOutcome::NavigatedToLogin
    }

    fn logout_source(&self) -> AuthSource {
        if let Some(source) = self.writer.snapshot().auth_source {
            return source;
        }
        let saved = self.credentials.load_session().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cannot read saved session");
            None
        });
        match saved {
            Some(session) => session.user.auth_source(),
            None if self.provider_has_session() => AuthSource::Federated,
            None => AuthSource::Local,
        }
    }

    fn run_logout_hooks(&self) {
        let hooks = lock(&self.logout_hooks);
        for (index, hook) in hooks.iter().enumerate() {
            if let Err(e) = hook() {
                tracing::warn!(hook = index, error = %e, "logout hook failed");
            }
        }
    }
}
