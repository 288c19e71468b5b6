//! cli::commands
//!
//! Command dispatch and handlers.
//!
//! # Architecture
//!
//! Each command handler:
//! 1. Loads configuration and wires an orchestrator from it
//! 2. Calls the orchestrator (or the credential store, for read-only views)
//! 3. Formats and displays output
//!
//! Handlers never write session state directly.
//!
//! # Async Commands
//!
//! Bootstrap, login and logout involve network I/O. Each handler builds a
//! current-thread tokio runtime and blocks on its async body.

mod boot;
mod completion;
mod config_cmd;
mod login;
mod logout;
mod status;

pub use boot::boot;
pub use completion::completion;
pub use config_cmd::{get as config_get, list as config_list, set as config_set};
pub use login::{login, sso};
pub use logout::logout;
pub use status::status;

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use super::args::{Command, ConfigAction};
use super::Context;
use crate::backend::{HttpSessionBackend, SessionBackend};
use crate::core::config::Config;
use crate::identity::{CachedIdentityClient, DisabledIdentity, IdentityClient};
use crate::profile::{HttpProfileClient, ProfileClient};
use crate::routing::{MemoryNavigator, Route};
use crate::secrets;
use crate::session::{BootstrapSettings, Collaborators, CredentialStore, Orchestrator};
use crate::ui::ConsoleNotifier;

/// Dispatch a command to its handler.
pub fn dispatch(command: Command, ctx: &Context) -> Result<()> {
    match command {
        Command::Boot { route, json } => boot::boot(ctx, &route, json),
        Command::Login {
            email,
            password_stdin,
        } => login::login(ctx, email.as_deref(), password_stdin),
        Command::Sso => login::sso(ctx),
        Command::Logout => logout::logout(ctx),
        Command::Status { json } => status::status(ctx, json),
        Command::Config { action } => match action {
            ConfigAction::Get { key } => config_cmd::get(ctx, &key),
            ConfigAction::Set { key, value } => config_cmd::set(ctx, &key, &value),
            ConfigAction::List => config_cmd::list(ctx),
        },
        Command::Completion { shell } => completion::completion(shell),
    }
}

/// Run an async command body to completion.
pub(crate) fn block_on<F: Future>(future: F) -> Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;
    Ok(runtime.block_on(future))
}

/// Open the configured credential store.
pub(crate) fn open_credentials(config: &Config) -> Result<CredentialStore> {
    let store = secrets::create_store(config.secrets_provider())
        .context("Failed to open secret store")?;
    Ok(CredentialStore::new(store))
}

/// An orchestrator wired from configuration, plus the navigator it reports to.
pub(crate) struct Wired {
    pub orchestrator: Orchestrator,
    pub navigator: MemoryNavigator,
}

/// Build an orchestrator whose navigator starts at `route`.
///
/// The identity provider is only used when both `identity.authority` and
/// `identity.client_id` are set; profile enrichment only when
/// `profile.base_url` is set.
pub(crate) fn build_orchestrator(config: &Config, ctx: &Context, route: &str) -> Result<Wired> {
    let credentials = open_credentials(config)?;

    let backend: Arc<dyn SessionBackend> = Arc::new(
        HttpSessionBackend::new(config.backend_url(), config.request_timeout())
            .context("Failed to create backend client")?,
    );

    let identity_config = config.identity();
    let identity: Arc<dyn IdentityClient> =
        if identity_config.authority.is_some() && identity_config.client_id.is_some() {
            Arc::new(
                CachedIdentityClient::from_config(&identity_config)
                    .context("Failed to open identity provider cache")?,
            )
        } else {
            tracing::debug!("identity provider not configured");
            Arc::new(DisabledIdentity)
        };

    let profile: Option<Arc<dyn ProfileClient>> = match config.profile_url() {
        Some(url) => Some(Arc::new(
            HttpProfileClient::new(url, config.request_timeout())
                .context("Failed to create profile client")?,
        )),
        None => None,
    };

    let navigator = MemoryNavigator::new(Route::new(route));
    let orchestrator = Orchestrator::new(
        Collaborators {
            credentials,
            identity,
            backend,
            profile,
            navigator: Arc::new(navigator.clone()),
            notifier: Arc::new(ConsoleNotifier::new(ctx.debug)),
        },
        BootstrapSettings::from_config(config),
    );

    Ok(Wired {
        orchestrator,
        navigator,
    })
}
