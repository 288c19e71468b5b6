//! session::credentials
//!
//! Persisted session credentials on top of a [`SecretStore`].
//!
//! # Keys
//!
//! | Key | Value |
//! |---|---|
//! | `session.token` | opaque backend token |
//! | `session.user` | [`UserRecord`] as JSON |
//! | `session.justLoggedOut` | `"true"`, read once |
//!
//! A [`LocalSession`] is written and removed as a unit. If a read finds only
//! half of one (a token without a user, or a user that no longer parses),
//! the remainder is deleted and the session reads as absent.

use sha2::{Digest, Sha256};

use super::user::UserRecord;
use crate::secrets::{SecretError, SecretStore};

/// Key holding the backend session token.
pub const TOKEN_KEY: &str = "session.token";

/// Key holding the cached user record.
pub const USER_KEY: &str = "session.user";

/// Key holding the one-shot "just logged out" flag.
pub const LOGGED_OUT_KEY: &str = "session.justLoggedOut";

/// Short, stable, non-reversible identifier for a token, for logs.
pub fn fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    hex::encode(&digest[..6])
}

/// A backend session: the token and the user it was issued to.
#[derive(Clone, PartialEq, Eq)]
pub struct LocalSession {
    pub token: String,
    pub user: UserRecord,
}

impl LocalSession {
    pub fn new(token: impl Into<String>, user: UserRecord) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }
}

impl std::fmt::Debug for LocalSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSession")
            .field("token", &format_args!("[{}]", fingerprint(&self.token)))
            .field("user", &self.user.id)
            .finish()
    }
}

/// Session credentials over a secret store.
pub struct CredentialStore {
    store: Box<dyn SecretStore>,
}

impl std::fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialStore").finish_non_exhaustive()
    }
}

impl CredentialStore {
    pub fn new(store: Box<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// The persisted token, if a complete session is present.
    pub fn session_token(&self) -> Result<Option<String>, SecretError> {
        let token = self.store.get(TOKEN_KEY)?;
        let has_user = self.store.exists(USER_KEY)?;
        match (token, has_user) {
            (Some(token), true) => Ok(Some(token)),
            (None, false) => Ok(None),
            _ => {
                tracing::warn!("discarding partially written session");
                self.clear_session()?;
                Ok(None)
            }
        }
    }

    /// The full persisted session.
    pub fn load_session(&self) -> Result<Option<LocalSession>, SecretError> {
        let Some(token) = self.session_token()? else {
            return Ok(None);
        };
        let Some(json) = self.store.get(USER_KEY)? else {
            return Ok(None);
        };
        match UserRecord::parse(&json) {
            Ok(user) => Ok(Some(LocalSession { token, user })),
            Err(e) => {
                tracing::warn!(error = %e, "discarding session with unreadable user record");
                self.clear_session()?;
                Ok(None)
            }
        }
    }

    /// Persist a session, token and user together.
    pub fn save_session(&self, session: &LocalSession) -> Result<(), SecretError> {
        let user = session
            .user
            .to_json()
            .map_err(|e| SecretError::Write(format!("cannot encode user record: {}", e)))?;
        self.store
            .set_many(&[(TOKEN_KEY, session.token.as_str()), (USER_KEY, user.as_str())])
    }

    /// Remove the session, token and user together.
    pub fn clear_session(&self) -> Result<(), SecretError> {
        self.store.delete_many(&[TOKEN_KEY, USER_KEY])
    }

    /// Record that the user just logged out.
    pub fn mark_logged_out(&self) -> Result<(), SecretError> {
        self.store.set(LOGGED_OUT_KEY, "true")
    }

    /// Consume the logged-out flag: true if it was set. Always deleted.
    pub fn take_logged_out(&self) -> Result<bool, SecretError> {
        let present = self.store.get(LOGGED_OUT_KEY)?.is_some();
        if present {
            self.store.delete(LOGGED_OUT_KEY)?;
        }
        Ok(present)
    }

    /// Whether the logged-out flag is set, without consuming it.
    pub fn is_logged_out_pending(&self) -> Result<bool, SecretError> {
        self.store.exists(LOGGED_OUT_KEY)
    }

    /// Drop the logged-out flag.
    pub fn clear_logged_out(&self) -> Result<(), SecretError> {
        self.store.delete(LOGGED_OUT_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::MemorySecretStore;
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

    fn store_with(entries: &[(&str, &str)]) -> (MemorySecretStore, CredentialStore) {
        let memory = MemorySecretStore::with_entries(entries.iter().copied());
        (memory.clone(), CredentialStore::new(Box::new(memory)))
    }

    #[test]
    fn save_then_load() {
        let (_, creds) = store_with(&[]);
        let session = LocalSession::new("tok", user());

        creds.save_session(&session).unwrap();

        assert_eq!(creds.session_token().unwrap().as_deref(), Some("tok"));
        assert_eq!(creds.load_session().unwrap(), Some(session));
    }

    #[test]
    fn clear_removes_both_keys() {
        let (memory, creds) = store_with(&[]);
        creds.save_session(&LocalSession::new("tok", user())).unwrap();

        creds.clear_session().unwrap();

        assert!(memory.keys().is_empty());
        assert!(creds.load_session().unwrap().is_none());
    }

    #[test]
    fn token_without_user_is_discarded() {
        let (memory, creds) = store_with(&[(TOKEN_KEY, "tok")]);

        assert!(creds.session_token().unwrap().is_none());
        assert!(memory.keys().is_empty());
    }

    #[test]
    fn unreadable_user_is_discarded() {
        let (memory, creds) = store_with(&[(TOKEN_KEY, "tok"), (USER_KEY, "{not json")]);

        assert!(creds.load_session().unwrap().is_none());
        assert!(memory.keys().is_empty());
    }

    #[test]
    fn logged_out_flag_is_single_read() {
        let (_, creds) = store_with(&[]);
        creds.mark_logged_out().unwrap();
        assert!(creds.is_logged_out_pending().unwrap());

        assert!(creds.take_logged_out().unwrap());
        assert!(!creds.take_logged_out().unwrap());
        assert!(!creds.is_logged_out_pending().unwrap());
    }

    #[test]
    fn debug_hides_token() {
        let session = LocalSession::new("super-secret-token", user());
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains("super-secret-token"));
        assert!(rendered.contains(&fingerprint("super-secret-token")));
    }

    #[test]
    fn fingerprint_is_stable_and_short() {
        assert_eq!(fingerprint("a"), fingerprint("a"));
        assert_ne!(fingerprint("a"), fingerprint("b"));
        assert_eq!(fingerprint("a").len(), 12);
    }
}
