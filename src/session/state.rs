//! session::state
//!
//! The observable authentication state.
//!
//! # Design
//!
//! [`AuthState`] lives in a `tokio::sync::watch` channel. Readers hold an
//! [`AuthStateHandle`]; there is exactly one structural writer, the
//! [`AuthWriter`] owned by the orchestrator. Background enrichment gets an
//! [`AvatarPatcher`], which can write the avatar field and nothing else.
//!
//! Every bootstrap run claims a [`RunTicket`] carrying a generation number.
//! Resolving with a ticket whose generation is no longer current is
//! rejected, so a run that lost a race (or was overtaken by logout) cannot
//! resurrect state.
//!
//! `is_booting` is not stored: it is derived from [`BootPhase`].

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::watch;

use super::credentials::{fingerprint, LocalSession};
use super::user::{AuthSource, AvatarRef, UserRecord};

/// Phase of the bootstrap state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BootPhase {
    /// Process started, nothing evaluated yet.
    Idle,
    /// A run is evaluating credentials.
    Booting,
    /// A run is inside the federated exchange.
    Exchanging,
    ResolvedLocal,
    ResolvedFederated,
    Unauthenticated,
}

impl BootPhase {
    /// True until a resolution has been written.
    pub fn is_booting(self) -> bool {
        matches!(
            self,
            BootPhase::Idle | BootPhase::Booting | BootPhase::Exchanging
        )
    }

    /// True while a run holds the state machine.
    pub fn is_in_flight(self) -> bool {
        matches!(self, BootPhase::Booting | BootPhase::Exchanging)
    }
}

impl std::fmt::Display for BootPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            BootPhase::Idle => "idle",
            BootPhase::Booting => "booting",
            BootPhase::Exchanging => "exchanging",
            BootPhase::ResolvedLocal => "resolved-local",
            BootPhase::ResolvedFederated => "resolved-federated",
            BootPhase::Unauthenticated => "unauthenticated",
        };
        f.write_str(name)
    }
}

/// Why a run resolved without a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnauthenticatedReason {
    /// Neither a local token nor a provider account was available.
    NoCredentials,
    /// The route is a public entry route.
    PublicRoute,
    /// The user logged out.
    SignedOut,
    /// A federated sign-in was attempted and failed.
    Failed,
}

impl UnauthenticatedReason {
    /// Sticky reasons block silent federated sign-in until an explicit login.
    pub fn is_sticky(self) -> bool {
        matches!(
            self,
            UnauthenticatedReason::SignedOut | UnauthenticatedReason::Failed
        )
    }
}

/// Snapshot of the authentication state.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthState {
    pub phase: BootPhase,
    pub user: Option<UserRecord>,
    pub token: Option<String>,
    pub auth_source: Option<AuthSource>,
    pub reason: Option<UnauthenticatedReason>,
    /// Bumped by every claim and by sign-out.
    pub generation: u64,
    /// Bumped by every write.
    pub version: u64,
}

impl AuthState {
    fn initial() -> Self {
        Self {
            phase: BootPhase::Idle,
            user: None,
            token: None,
            auth_source: None,
            reason: None,
            generation: 0,
            version: 0,
        }
    }

    pub fn is_booting(&self) -> bool {
        self.phase.is_booting()
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(
            self.phase,
            BootPhase::ResolvedLocal | BootPhase::ResolvedFederated
        ) && self.user.is_some()
            && self.token.is_some()
    }

    fn clear_identity(&mut self) {
        self.user = None;
        self.token = None;
        self.auth_source = None;
    }
}

impl std::fmt::Debug for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthState")
            .field("phase", &self.phase)
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .field(
                "token",
                &self.token.as_deref().map(|t| format!("[{}]", fingerprint(t))),
            )
            .field("auth_source", &self.auth_source)
            .field("reason", &self.reason)
            .field("generation", &self.generation)
            .field("version", &self.version)
            .finish()
    }
}

/// Read side of the state.
#[derive(Debug, Clone)]
pub struct AuthStateHandle {
    rx: watch::Receiver<AuthState>,
}

impl AuthStateHandle {
    /// Current state.
    pub fn snapshot(&self) -> AuthState {
        self.rx.borrow().clone()
    }

    /// A receiver that is notified on every write.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.rx.clone()
    }

    /// Wait until a resolution has been written, then return it.
    pub async fn resolved(&self) -> AuthState {
        let mut rx = self.rx.clone();
        if rx.wait_for(|state| !state.is_booting()).await.is_err() {
            tracing::debug!("auth writer dropped before resolution");
        }
        let state = rx.borrow().clone();
        state
    }
}

/// Outcome written by a resolving run.
#[derive(Debug, Clone)]
pub enum Resolution {
    Authenticated(LocalSession),
    Unauthenticated(UnauthenticatedReason),
}

/// Claim on the state machine for one run.
///
/// Dropping an unresolved ticket returns the phase to `Idle` so the next
/// trigger can run.
#[derive(Debug)]
pub struct RunTicket {
    tx: Arc<watch::Sender<AuthState>>,
    generation: u64,
    done: bool,
}

impl RunTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl Drop for RunTicket {
    fn drop(&mut self) {
        if self.done {
            return;
        }
        let generation = self.generation;
        self.tx.send_if_modified(|state| {
            if state.generation == generation && state.phase.is_in_flight() {
                state.phase = BootPhase::Idle;
                state.version += 1;
                true
            } else {
                false
            }
        });
    }
}

/// The single structural writer.
#[derive(Debug)]
pub struct AuthWriter {
    tx: Arc<watch::Sender<AuthState>>,
}

impl AuthWriter {
    /// Create the writer and a first read handle.
    pub fn new() -> (Self, AuthStateHandle) {
        let (tx, rx) = watch::channel(AuthState::initial());
        (Self { tx: Arc::new(tx) }, AuthStateHandle { rx })
    }

    pub fn handle(&self) -> AuthStateHandle {
        AuthStateHandle {
            rx: self.tx.subscribe(),
        }
    }

    pub fn snapshot(&self) -> AuthState {
        self.tx.borrow().clone()
    }

    /// Start a run. `None` if another run is in flight.
    pub fn claim(&self) -> Option<RunTicket> {
        let mut generation = None;
        self.tx.send_if_modified(|state| {
            if state.phase.is_in_flight() {
                return false;
            }
            state.generation += 1;
            state.version += 1;
            state.phase = BootPhase::Booting;
            generation = Some(state.generation);
            true
        });
        generation.map(|generation| RunTicket {
            tx: Arc::clone(&self.tx),
            generation,
            done: false,
        })
    }

    /// True if nothing has claimed or signed out since `ticket` was issued.
    pub fn is_current(&self, ticket: &RunTicket) -> bool {
        self.tx.borrow().generation == ticket.generation
    }

    /// Move a claimed run into the exchange phase.
    pub fn mark_exchanging(&self, ticket: &RunTicket) -> bool {
        self.tx.send_if_modified(|state| {
            if state.generation != ticket.generation || state.phase != BootPhase::Booting {
                return false;
            }
            state.phase = BootPhase::Exchanging;
            state.version += 1;
            true
        })
    }

    /// Write the outcome of a run. Rejected (returns false) if the ticket
    /// is stale.
    pub fn resolve(&self, mut ticket: RunTicket, resolution: Resolution) -> bool {
        ticket.done = true;
        let generation = ticket.generation;
        self.tx.send_if_modified(|state| {
            if state.generation != generation {
                return false;
            }
            match &resolution {
                Resolution::Authenticated(session) => {
                    let source = session.user.auth_source();
                    state.phase = match source {
                        AuthSource::Local => BootPhase::ResolvedLocal,
                        AuthSource::Federated => BootPhase::ResolvedFederated,
                    };
                    state.user = Some(session.user.clone());
                    state.token = Some(session.token.clone());
                    state.auth_source = Some(source);
                    state.reason = None;
                }
                Resolution::Unauthenticated(reason) => {
                    state.phase = BootPhase::Unauthenticated;
                    state.clear_identity();
                    state.reason = Some(*reason);
                }
            }
            state.version += 1;
            true
        })
    }

    /// Clear to unauthenticated and invalidate every outstanding ticket and
    /// patcher.
    pub fn sign_out(&self) {
        self.tx.send_modify(|state| {
            state.generation += 1;
            state.version += 1;
            state.phase = BootPhase::Unauthenticated;
            state.clear_identity();
            state.reason = Some(UnauthenticatedReason::SignedOut);
        });
    }

    /// Drop a sticky reason so the next run may sign in silently again.
    pub fn clear_sticky_reason(&self) -> bool {
        self.tx.send_if_modified(|state| {
            if state.reason.is_some_and(UnauthenticatedReason::is_sticky) {
                state.reason = None;
                state.version += 1;
                true
            } else {
                false
            }
        })
    }

    /// Avatar-only writer for the session currently resolved.
    pub fn avatar_patcher(&self) -> Option<AvatarPatcher> {
        let state = self.tx.borrow();
        if !state.is_authenticated() {
            return None;
        }
        let user_id = state.user.as_ref()?.id.clone();
        Some(AvatarPatcher {
            tx: Arc::clone(&self.tx),
            generation: state.generation,
            user_id,
        })
    }
}

/// Writes the avatar of one resolved session.
///
/// The patch is discarded if the state has since been re-claimed, signed out
/// or resolved to a different user.
#[derive(Debug, Clone)]
pub struct AvatarPatcher {
    tx: Arc<watch::Sender<AuthState>>,
    generation: u64,
    user_id: String,
}

impl AvatarPatcher {
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Apply the patch. Returns false if it was discarded.
    pub fn patch(&self, avatar: AvatarRef) -> bool {
        self.tx.send_if_modified(|state| {
            let current = state.generation == self.generation && state.is_authenticated();
            match state.user.as_mut() {
                Some(user) if current && user.id == self.user_id => {
                    if user.avatar.as_ref() == Some(&avatar) {
                        return false;
                    }
                    user.avatar = Some(avatar.clone());
                    state.version += 1;
                    true
                }
                _ => false,
            }
        })
    }
}
