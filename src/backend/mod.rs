//! backend
//!
//! The backend session service: validates local tokens, exchanges federated
//! tokens for local sessions, and performs password login.
//!
//! # Design
//!
//! `SessionBackend` is async because every call is network I/O. Users come
//! back from the wire in whatever shape the endpoint uses and are normalized
//! into [`UserRecord`] here, at the boundary, so nothing past this module
//! deals with optional identity fields.
//!
//! # Example
//!
//! ```
//! use latchkey::backend::mock::MockBackend;
//! use latchkey::backend::SessionBackend;
//!
//! # tokio_test::block_on(async {
//! let backend = MockBackend::new();
//! assert!(backend.validate_local_token("unknown").await.is_err());
//! # });
//! ```

mod http;
pub mod mock;

pub use http::HttpSessionBackend;

use async_trait::async_trait;
use thiserror::Error;

use crate::session::credentials::fingerprint;
use crate::session::{LocalSession, UserRecord};

/// Errors from backend session calls.
///
/// Messages carry status and server text only, never tokens.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The local token was not accepted.
    #[error("session token rejected (status {0})")]
    InvalidToken(u16),

    /// The federated exchange returned a non-success response.
    #[error("federated exchange failed: {status} - {message}")]
    ExchangeFailed { status: u16, message: String },

    /// Password login returned a non-success response.
    #[error("login rejected: {status} - {message}")]
    LoginRejected { status: u16, message: String },

    /// A success response could not be understood.
    #[error("malformed backend response: {0}")]
    Malformed(String),

    /// Transport failure.
    #[error("network error: {0}")]
    Network(String),
}

/// Identity sent along with a federated token.
#[derive(Clone, PartialEq, Eq)]
pub struct ExchangeRequest {
    pub federated_token: String,
    pub object_id: String,
    pub email: String,
    pub name: String,
}

impl std::fmt::Debug for ExchangeRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExchangeRequest")
            .field(
                "federated_token",
                &format_args!("[{}]", fingerprint(&self.federated_token)),
            )
            .field("object_id", &self.object_id)
            .field("email", &self.email)
            .field("name", &self.name)
            .finish()
    }
}

/// Backend session operations.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Resolve the user a local token belongs to.
    ///
    /// Any non-success response is [`BackendError::InvalidToken`].
    async fn validate_local_token(&self, token: &str) -> Result<UserRecord, BackendError>;

    /// Trade a federated token for a local session.
    ///
    /// Any non-success response is [`BackendError::ExchangeFailed`].
    async fn exchange_federated_token(
        &self,
        request: &ExchangeRequest,
    ) -> Result<LocalSession, BackendError>;

    /// Email/password login.
    async fn login_local(&self, email: &str, password: &str)
        -> Result<LocalSession, BackendError>;
}
