//! session::orchestrator
//!
//! The bootstrap orchestrator: decides, once per trigger, whether the
//! persisted local session or the identity provider's session is
//! authoritative, and publishes the result.
//!
//! # Run order
//!
//! 1. Identity interaction still in progress: do nothing yet.
//! 2. Inputs unchanged since the last resolution: do nothing.
//! 3. Another run in flight: do nothing (single flight).
//! 4. Public route without a provider session: unauthenticated.
//! 5. Case A: validate the persisted local token. Success resolves; failure
//!    clears the local session and falls through.
//! 6. Case B: consume the logged-out flag, then exchange the provider
//!    session for a local one.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use latchkey::backend::mock::MockBackend;
//! use latchkey::identity::mock::MockIdentity;
//! use latchkey::routing::{MemoryNavigator, RecordingNotifier};
//! use latchkey::secrets::MemorySecretStore;
//! use latchkey::session::{
//!     BootPhase, BootstrapSettings, Collaborators, CredentialStore, Orchestrator, RunOutcome,
//! };
//!
//! # tokio_test::block_on(async {
//! let orchestrator = Orchestrator::new(
//!     Collaborators {
//!         credentials: CredentialStore::new(Box::new(MemorySecretStore::new())),
//!         identity: Arc::new(MockIdentity::new()),
//!         backend: Arc::new(MockBackend::new()),
//!         profile: None,
//!         navigator: Arc::new(MemoryNavigator::new("/inventory")),
//!         notifier: Arc::new(RecordingNotifier::new()),
//!     },
//!     BootstrapSettings::default(),
//! );
//!
//! let outcome = orchestrator.run().await;
//! assert_eq!(outcome, RunOutcome::Resolved(BootPhase::Unauthenticated));
//! assert!(!orchestrator.state().snapshot().is_booting());
//! # });
//! ```

mod login;
mod logout;

pub use logout::LogoutOutcome;

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::credentials::{fingerprint, CredentialStore, LocalSession};
use super::enrichment::{pick_account, AvatarEnrichment};
use super::errors::SessionError;
use super::exchange::{guarded, Deadline, ExchangeSequence, StepError};
use super::state::{
    AuthStateHandle, AuthWriter, BootPhase, Resolution, RunTicket, UnauthenticatedReason,
};
use super::user::AuthSource;
use crate::backend::SessionBackend;
use crate::core::config::{Config, DEFAULT_EXCHANGE_TIMEOUT_SECS};
use crate::identity::{IdentityClient, ProviderAccount};
use crate::profile::ProfileClient;
use crate::routing::{Navigator, Notifier, Route, RoutePolicy};

/// Hook run on logout to clear state owned by other features.
pub type LogoutHook = Box<dyn Fn() -> anyhow::Result<()> + Send + Sync>;

/// Everything the orchestrator talks to.
pub struct Collaborators {
    pub credentials: CredentialStore,
    pub identity: Arc<dyn IdentityClient>,
    pub backend: Arc<dyn SessionBackend>,
    /// Profile enrichment is skipped entirely when `None`.
    pub profile: Option<Arc<dyn ProfileClient>>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
}

/// Tunables for bootstrap.
#[derive(Debug, Clone)]
pub struct BootstrapSettings {
    /// Budget for the whole federated exchange sequence.
    pub exchange_timeout: Duration,
    pub routes: RoutePolicy,
    pub api_scopes: Vec<String>,
    pub profile_scopes: Vec<String>,
    pub post_logout_redirect_uri: String,
}

impl Default for BootstrapSettings {
    fn default() -> Self {
        Self {
            exchange_timeout: Duration::from_secs(DEFAULT_EXCHANGE_TIMEOUT_SECS),
            routes: RoutePolicy::default(),
            api_scopes: vec!["openid".into(), "profile".into()],
            profile_scopes: vec!["User.Read".into()],
            post_logout_redirect_uri: "/login".into(),
        }
    }
}

impl BootstrapSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            exchange_timeout: config.exchange_timeout(),
            routes: RoutePolicy::new(config.login_route(), config.public_routes()),
            api_scopes: config.api_scopes(),
            profile_scopes: config.profile_scopes(),
            post_logout_redirect_uri: config.post_logout_redirect_uri(),
        }
    }
}

/// What a call to [`Orchestrator::run`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The identity provider is still processing a redirect.
    AwaitingInteraction,
    /// Another run holds the state machine.
    AlreadyRunning,
    /// Inputs have not changed since the last resolution.
    Unchanged,
    /// A resolution was written (or the run was overtaken); the phase after.
    Resolved(BootPhase),
    /// Shutdown interrupted the run before it resolved.
    Cancelled,
}

/// Inputs a resolution depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Trigger {
    route: Route,
    provider_authenticated: bool,
    accounts: Vec<String>,
    token: Option<String>,
    logged_out: bool,
}

/// The bootstrap orchestrator.
pub struct Orchestrator {
    credentials: CredentialStore,
    identity: Arc<dyn IdentityClient>,
    backend: Arc<dyn SessionBackend>,
    profile: Option<Arc<dyn ProfileClient>>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    writer: AuthWriter,
    handle: AuthStateHandle,
    settings: BootstrapSettings,
    last_trigger: Mutex<Option<Trigger>>,
    logout_hooks: Mutex<Vec<LogoutHook>>,
    enrichment: Mutex<Vec<JoinHandle<()>>>,
    /// Cancellation of the exchange currently in flight.
    exchange_cancel: Mutex<Option<CancellationToken>>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("state", &self.handle.snapshot())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Orchestrator {
    pub fn new(collaborators: Collaborators, settings: BootstrapSettings) -> Self {
        let (writer, handle) = AuthWriter::new();
        Self {
            credentials: collaborators.credentials,
            identity: collaborators.identity,
            backend: collaborators.backend,
            profile: collaborators.profile,
            navigator: collaborators.navigator,
            notifier: collaborators.notifier,
            writer,
            handle,
            settings,
            last_trigger: Mutex::new(None),
            logout_hooks: Mutex::new(Vec::new()),
            enrichment: Mutex::new(Vec::new()),
            exchange_cancel: Mutex::new(None),
            shutdown: CancellationToken::new(),
        }
    }

    /// Read handle on the published state.
    pub fn state(&self) -> AuthStateHandle {
        self.handle.clone()
    }

    pub fn settings(&self) -> &BootstrapSettings {
        &self.settings
    }

    /// Register a hook to run when the user logs out.
    pub fn on_logout<F>(&self, hook: F)
    where
        F: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
    {
        lock(&self.logout_hooks).push(Box::new(hook));
    }

    /// Cancel in-flight work. Runs that were interrupted still clean up.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Wait for background enrichment started so far.
    pub async fn wait_for_enrichment(&self) {
        let handles: Vec<_> = lock(&self.enrichment).drain(..).collect();
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "enrichment task failed");
            }
        }
    }

    /// Evaluate credentials for the current trigger.
    pub async fn run(&self) -> RunOutcome {
        if self.identity.interaction_in_progress() {
            tracing::debug!("identity interaction in progress");
            return RunOutcome::AwaitingInteraction;
        }

        let route = self.navigator.current_route();
        let trigger = self.observe(&route);
        let prior = self.writer.snapshot();

        if !prior.is_booting() && lock(&self.last_trigger).as_ref() == Some(&trigger) {
            tracing::debug!(phase = %prior.phase, "inputs unchanged");
            return RunOutcome::Unchanged;
        }

        let public = self.settings.routes.is_public(&route);
        if public && !self.provider_has_session() && prior.is_authenticated() {
            tracing::debug!(%route, "public route, keeping current session");
            return RunOutcome::Unchanged;
        }

        let Some(ticket) = self.writer.claim() else {
            tracing::debug!("bootstrap already running");
            return RunOutcome::AlreadyRunning;
        };
        let generation = ticket.generation();
        tracing::debug!(%route, generation, "bootstrap run");

        let outcome = self.resolve(ticket, &route).await;

        if outcome.is_ok() {
            *lock(&self.last_trigger) = Some(self.observe(&route));
        }
        match outcome {
            Ok(()) => RunOutcome::Resolved(self.writer.snapshot().phase),
            Err(_) => RunOutcome::Cancelled,
        }
    }

    /// Snapshot the inputs a resolution depends on.
    fn observe(&self, route: &Route) -> Trigger {
        let token = match self.credentials.session_token() {
            Ok(token) => token.as_deref().map(fingerprint),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read session token");
                None
            }
        };
        let logged_out = self.credentials.is_logged_out_pending().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "cannot read logged-out flag");
            false
        });
        Trigger {
            route: route.clone(),
            provider_authenticated: self.identity.is_authenticated(),
            accounts: self
                .identity
                .accounts()
                .into_iter()
                .map(|a| a.home_account_id)
                .collect(),
            token,
            logged_out,
        }
    }

    fn provider_has_session(&self) -> bool {
        self.identity.is_authenticated() && !self.identity.accounts().is_empty()
    }

    /// Guards past single-flight, then Case A, then Case B.
    ///
    /// `Err` only for shutdown before a resolution was written.
    async fn resolve(&self, ticket: RunTicket, route: &Route) -> Result<(), SessionError> {
        if self.settings.routes.is_public(route) && !self.provider_has_session() {
            tracing::debug!(%route, "public route without provider session");
            self.writer.resolve(
                ticket,
                Resolution::Unauthenticated(UnauthenticatedReason::PublicRoute),
            );
            return Ok(());
        }

        let ticket = match self.resolve_local(ticket).await? {
            Some(ticket) => ticket,
            None => return Ok(()),
        };
        self.resolve_federated(ticket).await;
        Ok(())
    }

    /// Case A. Returns the ticket back if resolution falls through.
    async fn resolve_local(&self, ticket: RunTicket) -> Result<Option<RunTicket>, SessionError> {
        let token = match self.credentials.session_token() {
            Ok(Some(token)) => token,
            Ok(None) => return Ok(Some(ticket)),
            Err(e) => {
                tracing::warn!(error = %e, "cannot read local session");
                return Ok(Some(ticket));
            }
        };

        let validated = guarded(&self.shutdown, self.backend.validate_local_token(&token))
            .await
            .ok_or(SessionError::Cancelled)?;

        match validated {
            Ok(user) => {
                if !self.writer.is_current(&ticket) {
                    return Ok(None);
                }
                let session = LocalSession::new(token, user);
                if let Err(e) = self.credentials.save_session(&session) {
                    tracing::warn!(error = %e, "cannot persist refreshed user");
                }
                tracing::info!(
                    user = %session.user.id,
                    source = %session.user.auth_source(),
                    token = %fingerprint(&session.token),
                    "resolved from local session"
                );
                let federated = session.user.auth_source() == AuthSource::Federated;
                let object_id = session.user.origin.object_id().map(str::to_string);
                self.writer.resolve(ticket, Resolution::Authenticated(session));
                if federated {
                    self.start_enrichment(object_id.as_deref());
                }
                Ok(None)
            }
            Err(e) => {
                let err = SessionError::InvalidLocalToken(e.to_string());
                tracing::warn!(error = %err, token = %fingerprint(&token), "clearing local session");
                if let Err(e) = self.credentials.clear_session() {
                    tracing::warn!(error = %e, "cannot clear local session");
                }
                Ok(Some(ticket))
            }
        }
    }

    /// Case B.
    async fn resolve_federated(&self, ticket: RunTicket) {
        match self.credentials.take_logged_out() {
            Ok(true) => {
                tracing::info!("just logged out, not signing in silently");
                self.writer.resolve(
                    ticket,
                    Resolution::Unauthenticated(UnauthenticatedReason::SignedOut),
                );
                return;
            }
            Ok(false) => {}
            Err(e) => {
                tracing::warn!(error = %e, "cannot read logged-out flag");
                self.writer.resolve(
                    ticket,
                    Resolution::Unauthenticated(UnauthenticatedReason::NoCredentials),
                );
                return;
            }
        }

        if let Some(reason) = self.writer.snapshot().reason.filter(|r| r.is_sticky()) {
            tracing::debug!(?reason, "silent sign-in blocked until explicit login");
            self.writer.resolve(ticket, Resolution::Unauthenticated(reason));
            return;
        }

        let account = match self.identity.accounts().into_iter().next() {
            Some(account) if self.identity.is_authenticated() => account,
            _ => {
                tracing::debug!("no credentials available");
                self.writer.resolve(
                    ticket,
                    Resolution::Unauthenticated(UnauthenticatedReason::NoCredentials),
                );
                return;
            }
        };

        self.exchange(ticket, account).await;
    }

    /// Federated exchange sequence, with its failure handling.
    async fn exchange(&self, ticket: RunTicket, account: ProviderAccount) {
        if !self.writer.mark_exchanging(&ticket) {
            return;
        }

        let cancel = self.shutdown.child_token();
        *lock(&self.exchange_cancel) = Some(cancel.clone());
        let deadline = Deadline::start(&cancel, self.settings.exchange_timeout);

        let sequence = ExchangeSequence {
            identity: self.identity.as_ref(),
            backend: self.backend.as_ref(),
            profile: self.profile.as_deref(),
            api_scopes: &self.settings.api_scopes,
            profile_scopes: &self.settings.profile_scopes,
        };
        let result = sequence.run(&account, &cancel).await;

        drop(deadline);
        lock(&self.exchange_cancel).take();

        if !self.writer.is_current(&ticket) {
            tracing::debug!("exchange overtaken, discarding result");
            return;
        }

        let err = match result {
            Ok(session) => {
                if let Err(e) = self.credentials.save_session(&session) {
                    tracing::warn!(error = %e, "cannot persist exchanged session");
                }
                tracing::info!(
                    user = %session.user.id,
                    token = %fingerprint(&session.token),
                    "resolved from federated session"
                );
                let object_id = session.user.origin.object_id().map(str::to_string);
                self.writer.resolve(ticket, Resolution::Authenticated(session));
                self.start_enrichment(object_id.as_deref());
                return;
            }
            Err(StepError::Cancelled) if self.shutdown.is_cancelled() => SessionError::Cancelled,
            Err(StepError::Cancelled) => {
                SessionError::ExchangeTimeout(self.settings.exchange_timeout)
            }
            Err(StepError::Failed(err)) => err,
        };

        self.fail_exchange(ticket, err);
    }

    /// Cleanup for a failed or timed-out exchange.
    fn fail_exchange(&self, ticket: RunTicket, err: SessionError) {
        tracing::error!(error = %err, "federated sign-in failed");

        if let Err(e) = self.credentials.clear_session() {
            tracing::warn!(error = %e, "cannot clear partial session");
        }
        self.writer.resolve(
            ticket,
            Resolution::Unauthenticated(UnauthenticatedReason::Failed),
        );

        let Some(notice) = err.notice() else {
            return;
        };
        self.notifier.notify(notice);

        let login = self.settings.routes.login_route();
        if !self.settings.routes.is_login(&self.navigator.current_route()) {
            self.navigator.navigate(login);
        }
    }

    /// Start background avatar enrichment for the session just resolved.
    fn start_enrichment(&self, object_id: Option<&str>) {
        let Some(profile) = self.profile.clone() else {
            return;
        };
        let Some(patcher) = self.writer.avatar_patcher() else {
            return;
        };
        let Some(account) = pick_account(self.identity.accounts(), object_id) else {
            tracing::debug!("no provider account for avatar enrichment");
            return;
        };

        let task = AvatarEnrichment {
            identity: Arc::clone(&self.identity),
            profile,
            scopes: self.settings.profile_scopes.clone(),
            account,
            patcher,
        };
        let handle = task.spawn(self.shutdown.child_token());

        let mut tasks = lock(&self.enrichment);
        tasks.retain(|h| !h.is_finished());
        tasks.push(handle);
    }
}
