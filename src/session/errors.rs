//! session::errors
//!
//! Error taxonomy for the bootstrap orchestrator.
//!
//! # Design
//!
//! Only failures that abort a resolution reach the user, and they reach the
//! user as a [`Notice`] rather than as the error text. Everything else is
//! recovered inside the orchestrator and logged.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use latchkey::session::{Notice, SessionError};
//!
//! let err = SessionError::ExchangeTimeout(Duration::from_secs(10));
//! assert!(err.is_user_visible());
//! assert_eq!(err.notice(), Some(Notice::CheckConnection));
//!
//! let err = SessionError::InvalidLocalToken("401".into());
//! assert!(!err.is_user_visible());
//! ```

use std::time::Duration;

use thiserror::Error;

use crate::secrets::SecretError;

/// User-visible notice raised when a resolution is aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Notice {
    /// Sign-in failed for a reason other than connectivity.
    AuthenticationFailed,
    /// Sign-in did not finish within its time budget.
    CheckConnection,
}

impl Notice {
    /// Short message for display.
    pub fn message(&self) -> &'static str {
        match self {
            Notice::AuthenticationFailed => "Authentication failed. Please sign in again.",
            Notice::CheckConnection => {
                "Sign-in is taking too long. Please check your connection and try again."
            }
        }
    }
}

impl std::fmt::Display for Notice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Errors from session bootstrap, login and logout.
///
/// # Security
///
/// Variants carry status descriptions only; token values never appear in
/// messages.
#[derive(Debug, Clone, Error)]
pub enum SessionError {
    /// The persisted local token was rejected. Recovered by falling through
    /// to federated resolution.
    #[error("local session token rejected: {0}")]
    InvalidLocalToken(String),

    /// Silent token acquisition from the identity provider failed.
    #[error("could not acquire identity provider token: {0}")]
    TokenAcquisitionFailed(String),

    /// The federated exchange did not finish within its budget.
    #[error("federated sign-in timed out after {0:?}")]
    ExchangeTimeout(Duration),

    /// The backend refused or failed the federated exchange.
    #[error("federated session exchange failed: {0}")]
    ExchangeFailed(String),

    /// Profile or avatar enrichment failed. Never affects resolution.
    #[error("profile enrichment failed: {0}")]
    ProfileEnrichmentFailed(String),

    /// The credential store could not be read or written.
    #[error("credential store error: {0}")]
    CredentialStore(String),

    /// Local email/password login was rejected.
    #[error("login failed: {0}")]
    LoginFailed(String),

    /// The run was cancelled by shutdown.
    #[error("session bootstrap cancelled")]
    Cancelled,

    /// Another bootstrap run is still in flight.
    #[error("another sign-in is already in progress")]
    Busy,
}

impl SessionError {
    /// Notice to raise for this error, if it is one the user sees.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            SessionError::ExchangeTimeout(_) => Some(Notice::CheckConnection),
            SessionError::TokenAcquisitionFailed(_) | SessionError::ExchangeFailed(_) => {
                Some(Notice::AuthenticationFailed)
            }
            _ => None,
        }
    }

    /// True if this error aborts a resolution and is surfaced to the user.
    pub fn is_user_visible(&self) -> bool {
        self.notice().is_some()
    }
}

impl From<SecretError> for SessionError {
    fn from(e: SecretError) -> Self {
        SessionError::CredentialStore(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_maps_to_connection_notice() {
        let err = SessionError::ExchangeTimeout(Duration::from_secs(3));
        assert_eq!(err.notice(), Some(Notice::CheckConnection));
        assert!(err.to_string().contains("3s"));
    }

    #[test]
    fn exchange_failures_map_to_generic_notice() {
        for err in [
            SessionError::TokenAcquisitionFailed("consent".into()),
            SessionError::ExchangeFailed("500".into()),
        ] {
            assert_eq!(err.notice(), Some(Notice::AuthenticationFailed));
        }
    }

    #[test]
    fn recovered_errors_are_silent() {
        for err in [
            SessionError::InvalidLocalToken("401".into()),
            SessionError::ProfileEnrichmentFailed("404".into()),
            SessionError::Cancelled,
            SessionError::Busy,
        ] {
            assert!(!err.is_user_visible(), "{err} should be silent");
        }
    }

    #[test]
    fn secret_error_converts() {
        let err: SessionError = SecretError::Write("disk full".into()).into();
        assert!(matches!(err, SessionError::CredentialStore(_)));
        assert!(err.to_string().contains("disk full"));
    }
}
