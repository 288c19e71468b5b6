//! Shared fixtures for orchestrator integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use latchkey::backend::mock::MockBackend;
use latchkey::identity::mock::MockIdentity;
use latchkey::profile::mock::MockProfile;
use latchkey::routing::{MemoryNavigator, RecordingNotifier, Route};
use latchkey::secrets::{MemorySecretStore, SecretStore};
use latchkey::session::credentials::{LOGGED_OUT_KEY, TOKEN_KEY, USER_KEY};
use latchkey::session::{
    BootstrapSettings, Collaborators, CredentialStore, LocalSession, Orchestrator, Role,
    UserOrigin, UserRecord,
};

pub fn api_scopes() -> Vec<String> {
    BootstrapSettings::default().api_scopes
}

pub fn profile_scopes() -> Vec<String> {
    BootstrapSettings::default().profile_scopes
}

pub fn user(id: &str, origin: UserOrigin) -> UserRecord {
    UserRecord {
        id: id.to_string(),
        name: format!("User {}", id),
        email: format!("{}@example.com", id),
        role: Role {
            level: 1,
            name: "Picker".to_string(),
        },
        department: Some("Receiving".to_string()),
        employee_id: None,
        warehouse_id: Some(3),
        origin,
        avatar: None,
    }
}

pub fn local_user(id: &str) -> UserRecord {
    user(id, UserOrigin::Local)
}

pub fn federated_user(id: &str, object_id: &str) -> UserRecord {
    user(
        id,
        UserOrigin::Federated {
            object_id: object_id.to_string(),
        },
    )
}

/// Collaborators wired around shared mocks.
pub struct Harness {
    pub orchestrator: Orchestrator,
    pub store: MemorySecretStore,
    pub identity: MockIdentity,
    pub backend: MockBackend,
    pub profile: MockProfile,
    pub navigator: MemoryNavigator,
    pub notifier: RecordingNotifier,
}

pub struct HarnessBuilder {
    route: String,
    identity: MockIdentity,
    backend: MockBackend,
    profile: Option<MockProfile>,
    settings: BootstrapSettings,
    store: MemorySecretStore,
}

impl HarnessBuilder {
    pub fn route(mut self, route: &str) -> Self {
        self.route = route.to_string();
        self
    }

    pub fn identity(mut self, identity: MockIdentity) -> Self {
        self.identity = identity;
        self
    }

    pub fn backend(mut self, backend: MockBackend) -> Self {
        self.backend = backend;
        self
    }

    pub fn profile(mut self, profile: MockProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn exchange_timeout(mut self, timeout: Duration) -> Self {
        self.settings.exchange_timeout = timeout;
        self
    }

    /// Persist a session before the orchestrator starts.
    pub fn saved_session(self, session: &LocalSession) -> Self {
        credentials(&self.store).save_session(session).unwrap();
        self
    }

    /// Leave the logged-out marker behind, as a previous logout would.
    pub fn just_logged_out(self) -> Self {
        credentials(&self.store).mark_logged_out().unwrap();
        self
    }

    pub fn build(self) -> Harness {
        let navigator = MemoryNavigator::new(Route::new(self.route));
        let notifier = RecordingNotifier::new();
        let profile = self.profile.clone().unwrap_or_default();

        let orchestrator = Orchestrator::new(
            Collaborators {
                credentials: credentials(&self.store),
                identity: Arc::new(self.identity.clone()),
                backend: Arc::new(self.backend.clone()),
                profile: self
                    .profile
                    .map(|p| Arc::new(p) as Arc<dyn latchkey::profile::ProfileClient>),
                navigator: Arc::new(navigator.clone()),
                notifier: Arc::new(notifier.clone()),
            },
            self.settings,
        );

        Harness {
            orchestrator,
            store: self.store,
            identity: self.identity,
            backend: self.backend,
            profile,
            navigator,
            notifier,
        }
    }
}

impl Harness {
    pub fn builder() -> HarnessBuilder {
        HarnessBuilder {
            route: "/".to_string(),
            identity: MockIdentity::new(),
            backend: MockBackend::new(),
            profile: None,
            settings: BootstrapSettings::default(),
            store: MemorySecretStore::new(),
        }
    }

    /// A second view on the same storage.
    pub fn credentials(&self) -> CredentialStore {
        credentials(&self.store)
    }

    pub fn has_saved_token(&self) -> bool {
        self.store.get(TOKEN_KEY).unwrap().is_some()
    }

    pub fn has_saved_user(&self) -> bool {
        self.store.get(USER_KEY).unwrap().is_some()
    }

    pub fn logged_out_marker(&self) -> Option<String> {
        self.store.get(LOGGED_OUT_KEY).unwrap()
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigator
            .history()
            .iter()
            .map(|r| r.as_str().to_string())
            .collect()
    }
}

fn credentials(store: &MemorySecretStore) -> CredentialStore {
    CredentialStore::new(Box::new(store.clone()))
}
