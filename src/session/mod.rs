//! session
//!
//! Session bootstrap and dual-credential reconciliation.
//!
//! # Architecture
//!
//! - [`user`]: canonical user identity and its normalization
//! - [`credentials`]: the persisted local session over a secret store
//! - [`state`]: the observable authentication state and its writers
//! - [`orchestrator`]: decides which credential source is authoritative
//!
//! The orchestrator is the only structural writer of [`AuthState`].
//! Everything else reads it through an [`AuthStateHandle`].

pub mod credentials;
mod enrichment;
mod errors;
mod exchange;
pub mod orchestrator;
mod state;
pub mod user;

pub use credentials::{CredentialStore, LocalSession};
pub use errors::{Notice, SessionError};
pub use orchestrator::{
    BootstrapSettings, Collaborators, LogoutHook, LogoutOutcome, Orchestrator, RunOutcome,
};
pub use state::{
    AuthState, AuthStateHandle, AuthWriter, AvatarPatcher, BootPhase, Resolution, RunTicket,
    UnauthenticatedReason,
};
pub use user::{AuthSource, AvatarRef, Role, UserOrigin, UserRecord};
