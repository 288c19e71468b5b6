//! login and sso commands - Explicit sign-in

use std::io::{self, BufRead};

use anyhow::{bail, Context as _, Result};

use super::{block_on, build_orchestrator};
use crate::cli::Context;
use crate::core::config::Config;
use crate::ui::{output, prompts};

/// Sign in with email and password.
pub fn login(ctx: &Context, email: Option<&str>, password_stdin: bool) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;

    let email = match email {
        Some(email) => email.to_string(),
        None => prompts::input("Email", None, ctx.interactive)
            .context("Email is required; pass --email in non-interactive mode")?,
    };
    let password = if password_stdin {
        read_password_line()?
    } else {
        prompts::password("Password", ctx.interactive)
            .context("Password is required; use --password-stdin in non-interactive mode")?
    };

    let wired = build_orchestrator(&config, ctx, config.login_route())?;
    let user = block_on(async {
        let result = wired.orchestrator.login_local(&email, &password).await;
        wired.orchestrator.wait_for_enrichment().await;
        result
    })??;

    output::print(
        format!("Signed in as {}", output::format_user(&user)),
        ctx.verbosity(),
    );
    Ok(())
}

/// Start federated sign-in.
pub fn sso(ctx: &Context) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let wired = build_orchestrator(&config, ctx, config.login_route())?;

    block_on(wired.orchestrator.begin_federated_login())?
        .context("Failed to start federated sign-in")?;

    output::print(
        "Complete sign-in in your browser, then run `lk boot`.",
        ctx.verbosity(),
    );
    Ok(())
}

fn read_password_line() -> Result<String> {
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password from stdin")?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        bail!("No password on stdin");
    }
    Ok(password.to_string())
}
