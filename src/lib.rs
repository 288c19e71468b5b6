//! Latchkey - session bootstrap and dual-credential reconciliation
//!
//! A client may hold two credentials at once: a local session token issued
//! by the application backend after password login, and a session with a
//! federated identity provider. On every load, latchkey decides which one is
//! authoritative, exchanges a provider token for a local session when
//! needed, and publishes a single observable authentication state.
//!
//! # Architecture
//!
//! - [`cli`] - Command-line interface layer (parses args, wires collaborators)
//! - [`session`] - Bootstrap orchestrator, auth state, credential store
//! - [`backend`] - Application backend: token validation, exchange, login
//! - [`identity`] - Federated identity provider
//! - [`profile`] - Directory profile and avatar enrichment
//! - [`routing`] - Routes, navigation, notices, and the route guard
//! - [`core`] - Configuration schema and loading
//! - [`secrets`] - Secret storage abstraction
//! - [`ui`] - User interaction utilities
//!
//! # Invariants
//!
//! 1. A saved local session always wins over the provider session
//! 2. Public entry routes never trigger a silent federated sign-in
//! 3. At most one bootstrap run is in flight at a time
//! 4. After logout, the next load does not silently sign back in

pub mod backend;
pub mod cli;
pub mod core;
pub mod identity;
pub mod profile;
pub mod routing;
pub mod secrets;
pub mod session;
pub mod ui;
