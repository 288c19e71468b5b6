//! backend::mock
//!
//! Mock backend for deterministic testing.
//!
//! Tokens, exchange results and logins are configured up front; every call
//! is recorded so tests can assert on how many network calls a run made.
//!
//! # Example
//!
//! ```
//! use latchkey::backend::mock::MockBackend;
//! use latchkey::backend::{BackendError, SessionBackend};
//!
//! # tokio_test::block_on(async {
//! let backend = MockBackend::new()
//!     .fail_exchange(BackendError::ExchangeFailed { status: 502, message: "down".into() });
//!
//! assert!(backend.validate_local_token("nope").await.is_err());
//! assert_eq!(backend.validate_calls(), 1);
//! # });
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{BackendError, ExchangeRequest, SessionBackend};
use crate::session::{LocalSession, UserRecord};

/// Mock backend.
///
/// Thread-safe via internal `Arc<Mutex<...>>`; clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    inner: Arc<Mutex<MockBackendInner>>,
}

#[derive(Debug, Default)]
struct MockBackendInner {
    /// Token -> user it validates to.
    valid_tokens: HashMap<String, UserRecord>,
    /// Result of the next exchange calls.
    exchange: Option<Result<LocalSession, BackendError>>,
    /// (email, password) -> session.
    logins: HashMap<(String, String), LocalSession>,
    /// Delay applied before every exchange answers.
    exchange_delay: Option<Duration>,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

/// Recorded backend call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    Validate { token: String },
    Exchange(ExchangeRequest),
    Login { email: String },
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockBackendInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accept `token` as a local session for `user`.
    pub fn with_valid_token(self, token: impl Into<String>, user: UserRecord) -> Self {
        self.lock().valid_tokens.insert(token.into(), user);
        self
    }

    /// Answer exchanges with `session`.
    pub fn with_exchange(self, session: LocalSession) -> Self {
        self.lock().exchange = Some(Ok(session));
        self
    }

    /// Fail exchanges with `err`.
    pub fn fail_exchange(self, err: BackendError) -> Self {
        self.lock().exchange = Some(Err(err));
        self
    }

    /// Delay every exchange answer.
    pub fn with_exchange_delay(self, delay: Duration) -> Self {
        self.lock().exchange_delay = Some(delay);
        self
    }

    /// Accept a password login.
    pub fn with_login(
        self,
        email: impl Into<String>,
        password: impl Into<String>,
        session: LocalSession,
    ) -> Self {
        self.lock()
            .logins
            .insert((email.into(), password.into()), session);
        self
    }

    /// Stop accepting `token`.
    pub fn revoke_token(&self, token: &str) {
        self.lock().valid_tokens.remove(token);
    }

    pub fn operations(&self) -> Vec<MockOperation> {
        self.lock().operations.clone()
    }

    pub fn clear_operations(&self) {
        self.lock().operations.clear();
    }

    pub fn validate_calls(&self) -> usize {
        self.count(|op| matches!(op, MockOperation::Validate { .. }))
    }

    pub fn exchange_calls(&self) -> usize {
        self.count(|op| matches!(op, MockOperation::Exchange(_)))
    }

    /// Exchange requests received, in order.
    pub fn exchange_requests(&self) -> Vec<ExchangeRequest> {
        self.lock()
            .operations
            .iter()
            .filter_map(|op| match op {
                MockOperation::Exchange(request) => Some(request.clone()),
                _ => None,
            })
            .collect()
    }

    fn count(&self, pred: impl Fn(&MockOperation) -> bool) -> usize {
        self.lock().operations.iter().filter(|op| pred(op)).count()
    }
}

#[async_trait]
impl SessionBackend for MockBackend {
    async fn validate_local_token(&self, token: &str) -> Result<UserRecord, BackendError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::Validate {
            token: token.to_string(),
        });
        inner
            .valid_tokens
            .get(token)
            .cloned()
            .ok_or(BackendError::InvalidToken(401))
    }

    async fn exchange_federated_token(
        &self,
        request: &ExchangeRequest,
    ) -> Result<LocalSession, BackendError> {
        let (delay, result) = {
            let mut inner = self.lock();
            inner.operations.push(MockOperation::Exchange(request.clone()));
            let result = inner.exchange.clone().unwrap_or(Err(BackendError::ExchangeFailed {
                status: 500,
                message: "no exchange configured".into(),
            }));
            (inner.exchange_delay, result)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        result
    }

    async fn login_local(
        &self,
        email: &str,
        password: &str,
    ) -> Result<LocalSession, BackendError> {
        let mut inner = self.lock();
        inner.operations.push(MockOperation::Login {
            email: email.to_string(),
        });
        inner
            .logins
            .get(&(email.to_string(), password.to_string()))
            .cloned()
            .ok_or(BackendError::LoginRejected {
                status: 401,
                message: "invalid email or password".into(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::user::{Role, UserOrigin};

    fn user() -> UserRecord {
        UserRecord {
            id: "1".into(),
            name: "Dana".into(),
            email: "dana@example.com".into(),
            role: Role {
                level: 1,
                name: "User".into(),
            },
            department: None,
            employee_id: None,
            warehouse_id: None,
            origin: UserOrigin::Local,
            avatar: None,
        }
    }

    #[tokio::test]
    async fn validates_configured_tokens_only() {
        let backend = MockBackend::new().with_valid_token("good", user());

        assert_eq!(backend.validate_local_token("good").await.unwrap().id, "1");
        assert_eq!(
            backend.validate_local_token("bad").await,
            Err(BackendError::InvalidToken(401))
        );
        assert_eq!(backend.validate_calls(), 2);
    }

    #[tokio::test]
    async fn unconfigured_exchange_fails() {
        let backend = MockBackend::new();
        let request = ExchangeRequest {
            federated_token: "f".into(),
            object_id: "o".into(),
            email: "e".into(),
            name: "n".into(),
        };

        assert!(backend.exchange_federated_token(&request).await.is_err());
        assert_eq!(backend.exchange_requests(), vec![request]);
    }

    #[tokio::test]
    async fn login_checks_password() {
        let backend = MockBackend::new().with_login(
            "dana@example.com",
            "pw",
            LocalSession::new("tok", user()),
        );

        assert!(backend.login_local("dana@example.com", "pw").await.is_ok());
        assert!(matches!(
            backend.login_local("dana@example.com", "wrong").await,
            Err(BackendError::LoginRejected { status: 401, .. })
        ));
    }
}
