//! ui
//!
//! The terminal side of `lk`: what gets printed ([`output`]), how credentials
//! are asked for ([`prompts`]), and where sign-in notices end up
//! ([`notifier`]).

pub mod notifier;
pub mod output;
pub mod prompts;

pub use notifier::ConsoleNotifier;
