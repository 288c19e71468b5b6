//! Logout flow: ordering, best-effort steps, and what the next load does.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{api_scopes, federated_user, local_user, Harness};
use latchkey::backend::mock::MockBackend;
use latchkey::identity::mock::{account, MockIdentity};
use latchkey::identity::IdentityError;
use latchkey::session::{
    BootPhase, LocalSession, LogoutOutcome, RunOutcome, UnauthenticatedReason,
};

fn local_harness() -> Harness {
    let session = LocalSession::new("tok-1", local_user("1"));
    Harness::builder()
        .route("/orders")
        .backend(MockBackend::new().with_valid_token("tok-1", local_user("1")))
        .saved_session(&session)
        .build()
}

fn federated_harness(identity: MockIdentity) -> Harness {
    let user = federated_user("9", "oid-dana");
    let session = LocalSession::new("tok-9", user.clone());
    Harness::builder()
        .route("/orders")
        .identity(identity)
        .backend(MockBackend::new().with_valid_token("tok-9", user))
        .saved_session(&session)
        .build()
}

#[tokio::test]
async fn local_logout_navigates_to_login() {
    let h = local_harness();
    h.orchestrator.run().await;

    let outcome = h.orchestrator.logout().await;
    let state = h.orchestrator.state().snapshot();

    assert_eq!(outcome, LogoutOutcome::NavigatedToLogin);
    assert_eq!(state.phase, BootPhase::Unauthenticated);
    assert_eq!(state.reason, Some(UnauthenticatedReason::SignedOut));
    assert!(state.user.is_none());
    assert!(state.token.is_none());
    assert!(!h.has_saved_token());
    assert!(!h.has_saved_user());
    assert!(h.logged_out_marker().is_some());
    assert_eq!(h.navigations(), vec!["/login".to_string()]);
    assert!(h.identity.logout_redirects().is_empty());
}

#[tokio::test]
async fn federated_logout_redirects_to_provider() {
    let h = federated_harness(MockIdentity::signed_in(account("dana")));
    h.orchestrator.run().await;

    let outcome = h.orchestrator.logout().await;

    assert_eq!(outcome, LogoutOutcome::RedirectedToProvider);
    assert_eq!(
        h.identity.logout_redirects(),
        vec![h.orchestrator.settings().post_logout_redirect_uri.clone()]
    );
    assert!(h.navigations().is_empty());
    assert!(!h.has_saved_token());
    assert!(h.logged_out_marker().is_some());
}

#[tokio::test]
async fn failed_provider_logout_still_signs_out_locally() {
    let identity = MockIdentity::signed_in(account("dana"))
        .fail_logout(IdentityError::Redirect("no browser".into()));
    let h = federated_harness(identity);
    h.orchestrator.run().await;

    let outcome = h.orchestrator.logout().await;

    assert_eq!(outcome, LogoutOutcome::NavigatedToLogin);
    assert_eq!(h.navigations(), vec!["/login".to_string()]);
    assert!(!h.has_saved_token());
    assert!(h.logged_out_marker().is_some());
}

#[tokio::test]
async fn hooks_run_and_failures_do_not_stop_cleanup() {
    let h = local_harness();
    h.orchestrator.run().await;

    let calls = Arc::new(AtomicUsize::new(0));
    h.orchestrator
        .on_logout(|| Err(anyhow::anyhow!("cache locked")));
    let counter = Arc::clone(&calls);
    h.orchestrator.on_logout(move || {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    h.orchestrator.logout().await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(!h.has_saved_token());
}

#[tokio::test]
async fn next_load_after_logout_does_not_sign_in() {
    let identity = MockIdentity::signed_in(account("dana"))
        .with_token(&api_scopes(), "fed-dana")
        .fail_logout(IdentityError::Redirect("no browser".into()));
    let h = federated_harness(identity);
    h.orchestrator.run().await;
    h.orchestrator.logout().await;

    // Provider session survived the failed redirect; the marker still wins.
    h.navigator.set_route("/orders");
    let outcome = h.orchestrator.run().await;

    assert_eq!(outcome, RunOutcome::Resolved(BootPhase::Unauthenticated));
    assert_eq!(
        h.orchestrator.state().snapshot().reason,
        Some(UnauthenticatedReason::SignedOut)
    );
    assert_eq!(h.backend.exchange_calls(), 0);
    assert!(h.logged_out_marker().is_none());
}

#[tokio::test(start_paused = true)]
async fn logout_during_exchange_discards_its_result() {
    let session = LocalSession::new("local-9", federated_user("9", "oid-dana"));
    let h = Harness::builder()
        .route("/orders")
        .identity(MockIdentity::signed_in(account("dana")).with_token(&api_scopes(), "fed-dana"))
        .backend(
            MockBackend::new()
                .with_exchange(session)
                .with_exchange_delay(Duration::from_secs(3)),
        )
        .build();
    let mut rx = h.orchestrator.state().subscribe();

    let logout = async {
        rx.wait_for(|s| s.phase == BootPhase::Exchanging)
            .await
            .unwrap();
        h.orchestrator.logout().await
    };
    let (_, outcome) = tokio::join!(h.orchestrator.run(), logout);

    // Let any stray timers fire.
    tokio::time::sleep(Duration::from_secs(5)).await;
    let state = h.orchestrator.state().snapshot();

    // Nothing was resolved, but the provider still holds the account.
    assert_eq!(outcome, LogoutOutcome::RedirectedToProvider);
    assert_eq!(h.identity.logout_redirects().len(), 1);
    assert!(h.navigations().is_empty());
    assert_eq!(state.reason, Some(UnauthenticatedReason::SignedOut));
    assert!(!state.is_authenticated());
    assert!(!h.has_saved_token());
    assert!(h.notifier.notices().is_empty());
}

#[tokio::test]
async fn logout_without_saved_session_never_exchanges() {
    let identity = MockIdentity::signed_in(account("dana")).with_token(&api_scopes(), "fed-dana");
    let h = Harness::builder()
        .route("/orders")
        .identity(identity)
        .backend(MockBackend::new().with_exchange(LocalSession::new(
            "local-9",
            federated_user("9", "oid-dana"),
        )))
        .build();

    let outcome = h.orchestrator.logout().await;

    assert_eq!(outcome, LogoutOutcome::RedirectedToProvider);
    assert_eq!(h.backend.exchange_calls(), 0);
    assert_eq!(h.backend.validate_calls(), 0);
    assert!(h.notifier.notices().is_empty());
    assert!(h.navigations().is_empty());
    assert!(!h.has_saved_token());
    assert!(h.logged_out_marker().is_some());
}

#[tokio::test]
async fn logout_reads_source_from_saved_user() {
    let user = federated_user("9", "oid-dana");
    let h = Harness::builder()
        .route("/orders")
        .identity(MockIdentity::new())
        .saved_session(&LocalSession::new("tok-9", user))
        .build();

    let outcome = h.orchestrator.logout().await;

    // Saved federated user: the provider is asked even without a live account.
    assert_eq!(outcome, LogoutOutcome::RedirectedToProvider);
    assert_eq!(h.backend.validate_calls(), 0);
    assert!(!h.has_saved_user());
}

#[tokio::test]
async fn logout_with_nothing_saved_goes_to_login() {
    let h = Harness::builder().route("/orders").build();

    let outcome = h.orchestrator.logout().await;

    assert_eq!(outcome, LogoutOutcome::NavigatedToLogin);
    assert_eq!(h.navigations(), vec!["/login".to_string()]);
    assert!(h.identity.logout_redirects().is_empty());
    assert_eq!(h.backend.exchange_calls(), 0);
}
