//! config command - Get, set, or list configuration values

use anyhow::{Context as _, Result};

use crate::cli::Context;
use crate::core::config::Config;
use crate::ui::output;

/// Get a configuration value.
pub fn get(_ctx: &Context, key: &str) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;

    // Unset keys print nothing.
    if let Some(value) = config.get_key(key)? {
        println!("{}", value);
    }
    Ok(())
}

/// Set a configuration value.
pub fn set(ctx: &Context, key: &str, value: &str) -> Result<()> {
    let mut config = Config::load().context("Failed to load config")?;
    config.set_key(key, value)?;

    let path = config.write_path()?;
    Config::write_atomic(&path, &config.file).context("Failed to write config")?;

    output::print(format!("Set {} = {}", key, value), ctx.verbosity());
    Ok(())
}

/// List all configuration values.
pub fn list(_ctx: &Context) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;

    match config.loaded_from() {
        Some(path) => println!("# {}", path.display()),
        None => println!("# defaults (no config file)"),
    }
    for key in Config::KEYS {
        match config.get_key(key)? {
            Some(value) => println!("{} = {}", key, value),
            None => println!("{} = (not set)", key),
        }
    }
    Ok(())
}
