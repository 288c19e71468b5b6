//! boot command - Resolve the session for a route

use anyhow::{Context as _, Result};

use super::{block_on, build_orchestrator};
use crate::cli::Context;
use crate::core::config::Config;
use crate::routing::{Navigator, Route, RouteGuard};
use crate::session::RunOutcome;
use crate::ui::output;

/// Run one bootstrap for `route` and report the result.
///
/// Background avatar enrichment is awaited before printing so the reported
/// state is the settled one.
pub fn boot(ctx: &Context, route: &str, json: bool) -> Result<()> {
    let config = Config::load().context("Failed to load config")?;
    let wired = build_orchestrator(&config, ctx, route)?;
    let orchestrator = &wired.orchestrator;

    let outcome = block_on(async {
        let outcome = orchestrator.run().await;
        orchestrator.wait_for_enrichment().await;
        outcome
    })?;
    tracing::debug!(?outcome, "bootstrap finished");

    let state = orchestrator.state().snapshot();
    let guard = RouteGuard::new(orchestrator.settings().routes.clone());
    let requested = Route::new(route);
    let decision = guard.check(&requested, &state);
    let navigations = wired.navigator.history();

    if json {
        let mut value = output::state_json(&state);
        value["route"] = serde_json::json!(requested.as_str());
        value["decision"] = serde_json::json!(output::format_decision(&decision));
        value["navigations"] = serde_json::json!(navigations
            .iter()
            .map(Route::as_str)
            .collect::<Vec<_>>());
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let verbosity = ctx.verbosity();
    if outcome == RunOutcome::AwaitingInteraction {
        output::warn(
            "identity provider is still completing a sign-in; run again once it finishes",
            verbosity,
        );
    }
    output::print(output::format_state(&state), verbosity);
    output::print(
        format!("route {}: {}", requested, output::format_decision(&decision)),
        verbosity,
    );
    if !navigations.is_empty() {
        output::print(
            format!("navigated:\n{}", output::indented(&navigations)),
            verbosity,
        );
        tracing::debug!(current = %wired.navigator.current_route(), "final route");
    }

    Ok(())
}
