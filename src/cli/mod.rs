//! cli
//!
//! Command-line interface layer for latchkey.
//!
//! # Responsibilities
//!
//! - Parse command-line arguments and global flags
//! - Wire configured collaborators into an [`crate::session::Orchestrator`]
//! - Delegate to command handlers and format their results
//!
//! The CLI layer is thin: every session decision is made by the
//! orchestrator.

pub mod args;
pub mod commands;

pub use args::Cli;

use anyhow::Result;

use crate::ui::output::Verbosity;
use crate::ui::prompts;

/// Flags shared by every command handler.
#[derive(Debug, Clone, Copy)]
pub struct Context {
    pub debug: bool,
    pub quiet: bool,
    pub interactive: bool,
}

impl Context {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_quiet(self.quiet)
    }
}

/// Run the CLI application.
///
/// This is the main entry point called from `main.rs`.
pub fn run() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(cli.global.debug);

    let ctx = cli.global.context(prompts::stdin_is_tty());
    commands::dispatch(cli.command, &ctx)
}

/// Install the fmt subscriber. `RUST_LOG` wins; otherwise `--debug` turns on
/// debug output for this crate and everything else stays at `warn`.
fn init_tracing(debug: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if debug { "warn,latchkey=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // A subscriber may already be installed when embedded; keep that one.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(debug)
        .try_init();
}
