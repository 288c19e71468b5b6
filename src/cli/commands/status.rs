//! status command - Show the saved session without contacting the backend

use anyhow::{Context as _, Result};

use super::open_credentials;
use crate::cli::Context;
use crate::core::config::Config;
use crate::session::credentials::fingerprint;
use crate::ui::output;

/// Show what is saved in the credential store.
pub fn status(ctx: &Context, json: bool) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let credentials = open_credentials(&config)?;

    let session = credentials
        .load_session()
        .context("Failed to read saved session")?;
    let logged_out = credentials
        .is_logged_out_pending()
        .context("Failed to read logout marker")?;

    if json {
        let value = serde_json::json!({
            "saved": session.is_some(),
            "user": session.as_ref().map(|s| &s.user),
            "source": session.as_ref().map(|s| s.user.auth_source()),
            "tokenFingerprint": session.as_ref().map(|s| fingerprint(&s.token)),
            "loggedOutPending": logged_out,
            "config": config.loaded_from(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let verbosity = ctx.verbosity();
    match &session {
        Some(session) => {
            output::print(
                format!("user: {}", output::format_user(&session.user)),
                verbosity,
            );
            output::print(format!("source: {}", session.user.auth_source()), verbosity);
            output::print(format!("token: {}", fingerprint(&session.token)), verbosity);
        }
        None => output::print("No saved session.", verbosity),
    }
    if logged_out {
        output::print(
            "Logged out: silent provider sign-in is suppressed until the next boot.",
            verbosity,
        );
    }
    if let Some(path) = config.loaded_from() {
        tracing::debug!(path = %path.display(), "config");
    }
    Ok(())
}
