//! logout command - Sign out locally and at the provider

use anyhow::{Context as _, Result};

use super::{block_on, build_orchestrator};
use crate::cli::Context;
use crate::core::config::Config;
use crate::session::LogoutOutcome;
use crate::ui::output;

/// Sign out without resolving the session first: logout works from what is
/// saved locally and never contacts the backend.
pub fn logout(ctx: &Context) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let wired = build_orchestrator(&config, ctx, "/")?;
    let orchestrator = &wired.orchestrator;

    let outcome = block_on(orchestrator.logout())?;

    let message = match outcome {
        LogoutOutcome::RedirectedToProvider => "Signed out; finish in your browser.",
        LogoutOutcome::NavigatedToLogin => "Signed out.",
    };
    output::print(message, ctx.verbosity());
    Ok(())
}
