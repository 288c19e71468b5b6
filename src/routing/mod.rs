//! routing
//!
//! The navigation boundary: where the user is, where the orchestrator may
//! send them, and which routes are reachable without a session.
//!
//! # Example
//!
//! ```
//! use latchkey::routing::{GuardDecision, Route, RouteGuard, RoutePolicy};
//!
//! let policy = RoutePolicy::new("/login", ["/login", "/register"]);
//! assert!(policy.is_public(&Route::new("/login?next=/orders")));
//! assert!(!policy.is_public(&Route::new("/orders")));
//! ```

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::session::{AuthState, Notice};

/// An application route: a path plus optional query and fragment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Route(String);

impl Route {
    pub fn new(route: impl Into<String>) -> Self {
        Self(route.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The path, without query or fragment.
    pub fn path(&self) -> &str {
        let end = self.0.find(['?', '#']).unwrap_or(self.0.len());
        &self.0[..end]
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Route {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Where the user is and how to move them.
pub trait Navigator: Send + Sync {
    fn current_route(&self) -> Route;

    fn navigate(&self, route: &Route);
}

/// Receives user-visible notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Public routes and the login route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePolicy {
    login: Route,
    public: Vec<String>,
}

impl RoutePolicy {
    pub fn new<I, S>(login: impl Into<String>, public: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let login = Route::new(login);
        let mut public: Vec<String> = public.into_iter().map(Into::into).collect();
        if !public.iter().any(|p| p == login.path()) {
            public.push(login.path().to_string());
        }
        Self { login, public }
    }

    pub fn login_route(&self) -> &Route {
        &self.login
    }

    /// True for public entry routes and anything nested under them.
    pub fn is_public(&self, route: &Route) -> bool {
        let path = route.path();
        self.public.iter().any(|p| {
            path == p
                || path
                    .strip_prefix(p.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    /// True if `route` is the login route itself.
    pub fn is_login(&self, route: &Route) -> bool {
        route.path() == self.login.path()
    }
}

impl Default for RoutePolicy {
    fn default() -> Self {
        Self::new("/login", ["/login", "/register"])
    }
}

/// What a protected route should do with the current state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    /// Bootstrap has not resolved yet.
    Wait,
    RedirectToLogin(Route),
}

/// Route guard: reads the state, never writes it.
#[derive(Debug, Clone, Default)]
pub struct RouteGuard {
    policy: RoutePolicy,
}

impl RouteGuard {
    pub fn new(policy: RoutePolicy) -> Self {
        Self { policy }
    }

    pub fn check(&self, route: &Route, state: &AuthState) -> GuardDecision {
        if self.policy.is_public(route) {
            GuardDecision::Allow
        } else if state.is_booting() {
            GuardDecision::Wait
        } else if state.is_authenticated() {
            GuardDecision::Allow
        } else {
            GuardDecision::RedirectToLogin(self.policy.login_route().clone())
        }
    }
}

/// In-memory navigator that records every navigation.
#[derive(Debug, Clone)]
pub struct MemoryNavigator {
    inner: Arc<Mutex<NavigatorInner>>,
}

#[derive(Debug)]
struct NavigatorInner {
    current: Route,
    history: Vec<Route>,
}

impl MemoryNavigator {
    pub fn new(start: impl Into<Route>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(NavigatorInner {
                current: start.into(),
                history: Vec::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, NavigatorInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move without it counting as an orchestrator navigation.
    pub fn set_route(&self, route: impl Into<Route>) {
        self.lock().current = route.into();
    }

    /// Routes navigated to, oldest first.
    pub fn history(&self) -> Vec<Route> {
        self.lock().history.clone()
    }
}

impl Navigator for MemoryNavigator {
    fn current_route(&self) -> Route {
        self.lock().current.clone()
    }

    fn navigate(&self, route: &Route) {
        tracing::debug!(%route, "navigate");
        let mut inner = self.lock();
        inner.current = route.clone();
        inner.history.push(route.clone());
    }
}

/// Notifier that keeps notices for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notices(&self) -> Vec<Notice> {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notice);
    }
}
