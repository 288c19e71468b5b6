//! Architecture enforcement tests.
//!
//! The orchestrator is the only structural writer of the auth state and the
//! only code that mutates saved sessions. These tests scan the source tree
//! so a violation is caught in CI rather than in review.
//!
//! # Test Categories
//!
//! 1. **Single Writer** - Only `session::state` holds the watch sender
//! 2. **Thin CLI** - Command handlers never write the credential store
//! 3. **Layering** - The session core does not reach up into cli or ui, and
//!    does not speak HTTP itself
//! 4. **No Panics** - Library code propagates errors instead of unwrapping

use std::fs;
use std::path::{Path, PathBuf};

/// Collect every `.rs` file under `dir`.
fn rust_files(dir: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir).expect("Failed to read source directory") {
            let path = entry.expect("Failed to read entry").path();
            if path.is_dir() {
                pending.push(path);
            } else if path.extension().is_some_and(|e| e == "rs") {
                files.push(path);
            }
        }
    }
    files.sort();
    files
}

/// Source lines before the first test module, with comments dropped.
fn non_test_code(path: &Path) -> Vec<(usize, String)> {
    let content =
        fs::read_to_string(path).unwrap_or_else(|_| panic!("Failed to read {}", path.display()));
    content
        .lines()
        .enumerate()
        .take_while(|(_, line)| {
            let line = line.trim_start();
            !(line.starts_with("#[cfg(test)]") || line.starts_with("#[cfg(all(test"))
        })
        .filter(|(_, line)| !line.trim_start().starts_with("//"))
        .map(|(n, line)| (n + 1, line.to_string()))
        .collect()
}

fn violations(dir: &str, skip: &[&str], patterns: &[&str]) -> Vec<String> {
    let mut found = Vec::new();
    for path in rust_files(Path::new(dir)) {
        let display = path.display().to_string();
        if skip.iter().any(|s| display.ends_with(s)) {
            continue;
        }
        for (line_no, line) in non_test_code(&path) {
            for pattern in patterns {
                if line.contains(pattern) {
                    found.push(format!("{}:{}: {}", display, line_no, line.trim()));
                }
            }
        }
    }
    found
}

// =============================================================================
// Single Writer
// =============================================================================

#[test]
fn only_state_module_writes_auth_state() {
    let found = violations(
        "src",
        &["session/state.rs"],
        &["watch::Sender", "send_modify", "send_if_modified", "send_replace"],
    );

    assert!(
        found.is_empty(),
        "auth state written outside session::state:\n{}",
        found.join("\n")
    );
}

// =============================================================================
// Thin CLI
// =============================================================================

#[test]
fn commands_do_not_write_sessions() {
    let found = violations(
        "src/cli",
        &[],
        &[
            "save_session",
            "clear_session",
            "mark_logged_out",
            "take_logged_out",
            "clear_logged_out",
        ],
    );

    assert!(
        found.is_empty(),
        "command handlers must go through the orchestrator:\n{}",
        found.join("\n")
    );
}

// =============================================================================
// Layering
// =============================================================================

#[test]
fn session_core_stays_below_cli_and_ui() {
    let found = violations("src/session", &[], &["crate::cli", "crate::ui", "reqwest"]);

    assert!(
        found.is_empty(),
        "session core depends on an outer layer:\n{}",
        found.join("\n")
    );
}

// =============================================================================
// No Panics
// =============================================================================

#[test]
fn library_code_does_not_unwrap() {
    let found = violations("src", &[], &[".unwrap()", ".expect("]);

    assert!(
        found.is_empty(),
        "unwrap/expect outside tests:\n{}",
        found.join("\n")
    );
}
