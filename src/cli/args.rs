//! cli::args
//!
//! The `lk` command line. Global flags live in [`GlobalArgs`] and are
//! accepted before or after the subcommand.

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use super::Context;

/// latchkey - session bootstrap for the warehouse client
#[derive(Parser, Debug)]
#[command(name = "lk", version, about)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug, Clone, Copy)]
pub struct GlobalArgs {
    /// Log bootstrap decisions to stderr
    #[arg(long, global = true)]
    pub debug: bool,

    /// Print only results; never prompt
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Prompt for missing input even when stdin is not a terminal
    #[arg(long = "interactive", global = true, conflicts_with = "no_interactive")]
    pub force_interactive: bool,

    /// Never prompt; fail when input is missing
    #[arg(long, global = true)]
    pub no_interactive: bool,
}

impl GlobalArgs {
    /// Resolve the flags into a handler context. Prompting follows the
    /// terminal unless a flag says otherwise; `--quiet` rules it out.
    pub fn context(&self, stdin_is_tty: bool) -> Context {
        let interactive = match (self.force_interactive, self.no_interactive || self.quiet) {
            (true, _) => true,
            (false, true) => false,
            (false, false) => stdin_is_tty,
        };
        Context {
            debug: self.debug,
            quiet: self.quiet,
            interactive,
        }
    }
}

impl Cli {
    pub fn parse_args() -> Self {
        Parser::parse()
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Resolve the session for a route
    #[command(
        long_about = "Resolve which credential is authoritative and print the result.\n\n\
            Runs the bootstrap once for the given route: a saved local session is \
            validated first; without one, a signed-in identity provider account is \
            exchanged for a local session. Public routes never sign in silently.",
        after_help = "\
WORKFLOW EXAMPLES:
    # Resolve for the application root
    lk boot

    # What would the orders page do?
    lk boot --route /orders

    # Machine-readable
    lk boot --json"
    )]
    Boot {
        /// Route the bootstrap is evaluated for
        #[arg(long, default_value = "/")]
        route: String,

        /// Print the resulting state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Sign in with email and password
    #[command(after_help = "\
WORKFLOW EXAMPLES:
    # Prompt for both
    lk login

    # Scripted: password on stdin
    echo \"$PASSWORD\" | lk login --email dana@example.com --password-stdin")]
    Login {
        /// Account email; prompted for when omitted
        #[arg(long, value_name = "ADDRESS")]
        email: Option<String>,

        /// Take the password from the first line of stdin
        #[arg(long)]
        password_stdin: bool,
    },

    /// Sign in through the identity provider
    #[command(long_about = "Open the identity provider's sign-in page.\n\n\
            After the provider redirects back, the next `lk boot` exchanges the \
            provider session for a local one.")]
    Sso,

    /// Sign out
    #[command(long_about = "Sign out and suppress silent sign-in on the next load.\n\n\
            Federated sessions are also ended at the identity provider.")]
    Logout,

    /// Show the saved session without contacting the backend
    Status {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Inspect or change settings in config.toml
    #[command(after_help = "\
WORKFLOW EXAMPLES:
    lk config list
    lk config set backend.base_url https://wms.example.com
    lk config get bootstrap.exchange_timeout_secs")]
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print a tab-completion script for SHELL
    #[command(after_help = "\
WORKFLOW EXAMPLES:
    lk completion bash >> ~/.bashrc
    lk completion zsh >> ~/.zshrc
    lk completion fish > ~/.config/fish/completions/lk.fish")]
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Print the effective value of KEY (empty when unset)
    Get { key: String },
    /// Validate VALUE and write it to the config file
    Set { key: String, value: String },
    /// Print every known key with its effective value
    List,
}
