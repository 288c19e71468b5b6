//! ui::output
//!
//! Everything `lk` prints about a session. Informational lines go to stdout
//! and are dropped under `--quiet`; warnings and errors go to stderr. A
//! token is never printed, only its fingerprint.

use std::fmt::Display;

use crate::routing::GuardDecision;
use crate::session::credentials::fingerprint;
use crate::session::{AuthState, UnauthenticatedReason, UserRecord};

/// Whether informational output is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
}

impl Verbosity {
    pub fn from_quiet(quiet: bool) -> Self {
        if quiet {
            Verbosity::Quiet
        } else {
            Verbosity::Normal
        }
    }

    fn shows_info(self) -> bool {
        self == Verbosity::Normal
    }
}

pub fn print(message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_info() {
        println!("{}", message);
    }
}

pub fn warn(message: impl Display, verbosity: Verbosity) {
    if verbosity.shows_info() {
        eprintln!("warning: {}", message);
    }
}

/// Shown regardless of verbosity.
pub fn error(message: impl Display) {
    eprintln!("error: {}", message);
}

/// One-line description of a user.
pub fn format_user(user: &UserRecord) -> String {
    let mut line = format!("{} <{}> ({})", user.name, user.email, user.role.name);
    if let Some(department) = &user.department {
        line.push_str(&format!(", {}", department));
    }
    line
}

/// Human-readable reason for being signed out.
pub fn format_reason(reason: UnauthenticatedReason) -> &'static str {
    match reason {
        UnauthenticatedReason::NoCredentials => "no saved session or provider account",
        UnauthenticatedReason::PublicRoute => "public route",
        UnauthenticatedReason::SignedOut => "signed out",
        UnauthenticatedReason::Failed => "sign-in failed",
    }
}

/// Multi-line summary of an auth state.
pub fn format_state(state: &AuthState) -> String {
    let mut lines = vec![format!("phase: {}", state.phase)];
    match (&state.user, &state.token) {
        (Some(user), Some(token)) if state.is_authenticated() => {
            lines.push(format!("user: {}", format_user(user)));
            if let Some(source) = state.auth_source {
                lines.push(format!("source: {}", source));
            }
            lines.push(format!("token: {}", fingerprint(token)));
            if let Some(avatar) = &user.avatar {
                let kind = if avatar.is_inline() { "inline" } else { "url" };
                lines.push(format!("avatar: {}", kind));
            }
        }
        _ => {
            if let Some(reason) = state.reason {
                lines.push(format!("reason: {}", format_reason(reason)));
            }
        }
    }
    lines.join("\n")
}

/// Machine-readable view of an auth state. The token appears only as its
/// fingerprint.
pub fn state_json(state: &AuthState) -> serde_json::Value {
    let authenticated = state.is_authenticated();
    serde_json::json!({
        "phase": state.phase,
        "authenticated": authenticated,
        "source": state.auth_source,
        "reason": state.reason,
        "user": if authenticated { state.user.as_ref() } else { None },
        "tokenFingerprint": if authenticated {
            state.token.as_deref().map(fingerprint)
        } else {
            None
        },
    })
}

/// Describe a guard decision.
pub fn format_decision(decision: &GuardDecision) -> String {
    match decision {
        GuardDecision::Allow => "allow".to_string(),
        GuardDecision::Wait => "wait".to_string(),
        GuardDecision::RedirectToLogin(route) => format!("redirect to {}", route),
    }
}

/// One item per line, each indented by two spaces.
pub fn indented<T: Display>(items: &[T]) -> String {
    items.iter().fold(String::new(), |mut out, item| {
        if !out.is_empty() {
            out.push('\n');
        }
        out.push_str(&format!("  {}", item));
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::Route;
    use crate::session::{Role, UserOrigin};

    fn user() -> UserRecord {
        UserRecord {
            id: "1".into(),
            name: "Dana".into(),
            email: "dana@example.com".into(),
            role: Role {
                level: 2,
                name: "Supervisor".into(),
            },
            department: Some("Receiving".into()),
            employee_id: None,
            warehouse_id: None,
            origin: UserOrigin::Local,
            avatar: None,
        }
    }

    #[test]
    fn user_line() {
        assert_eq!(
            format_user(&user()),
            "Dana <dana@example.com> (Supervisor), Receiving"
        );
    }

    #[test]
    fn decision_text() {
        assert_eq!(
            format_decision(&GuardDecision::RedirectToLogin(Route::new("/login"))),
            "redirect to /login"
        );
    }

    #[test]
    fn initial_state_json_is_unauthenticated() {
        let (writer, _handle) = crate::session::AuthWriter::new();
        let value = state_json(&writer.snapshot());
        assert_eq!(value["phase"], "idle");
        assert_eq!(value["authenticated"], false);
        assert!(value["user"].is_null());
        assert!(value["tokenFingerprint"].is_null());
    }

    #[test]
    fn navigations_are_indented() {
        assert_eq!(indented(&["/login", "/orders"]), "  /login\n  /orders");
        assert_eq!(indented::<&str>(&[]), "");
    }

    #[test]
    fn quiet_hides_info() {
        assert!(!Verbosity::from_quiet(true).shows_info());
        assert!(Verbosity::from_quiet(false).shows_info());
    }
}
