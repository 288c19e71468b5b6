//! ui::prompts
//!
//! Asking for an email or password on the terminal. Without an interactive
//! context every prompt fails immediately, so scripted runs never hang on
//! stdin.

use std::io::{self, BufRead, IsTerminal, Write};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    /// End of input or an empty answer with nothing to fall back on.
    #[error("no answer given")]
    Cancelled,

    #[error("input required but prompting is disabled")]
    NotInteractive,

    #[error("terminal error: {0}")]
    Terminal(#[from] io::Error),
}

/// True if stdin is a terminal.
pub fn stdin_is_tty() -> bool {
    io::stdin().is_terminal()
}

/// Prompt for a line of text.
///
/// An empty answer takes `default` if there is one.
pub fn input(message: &str, default: Option<&str>, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }

    match default {
        Some(d) => print!("{} [{}]: ", message, d),
        None => print!("{}: ", message),
    }
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        return Err(PromptError::Cancelled);
    }

    let answer = line.trim();
    match (answer.is_empty(), default) {
        (true, Some(d)) => Ok(d.to_string()),
        (true, None) => Err(PromptError::Cancelled),
        (false, _) => Ok(answer.to_string()),
    }
}

/// Prompt for masked input (passwords). The input is not echoed.
pub fn password(message: &str, interactive: bool) -> Result<String, PromptError> {
    if !interactive {
        return Err(PromptError::NotInteractive);
    }
    let value = rpassword::prompt_password(format!("{}: ", message))?;
    Some(value)
        .filter(|v| !v.is_empty())
        .ok_or(PromptError::Cancelled)
}
