//! Property-based tests for user normalization and other pure helpers.
//!
//! These tests use proptest to check invariants across randomly generated
//! backend payloads, tokens and routes.

use proptest::prelude::*;

use latchkey::routing::{Route, RoutePolicy};
use latchkey::session::credentials::fingerprint;
use latchkey::session::user::{NormalizeError, WireId, WireUser};
use latchkey::session::{AuthSource, UserOrigin, UserRecord};

/// Strategy for a plausible email address.
fn email() -> impl Strategy<Value = String> {
    ("[a-z][a-z0-9.]{0,15}", "[a-z]{2,10}").prop_map(|(local, domain)| {
        format!("{}@{}.example", local, domain)
    })
}

/// Strategy for an optional string that may be blank.
fn maybe_blank() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        Just(Some(String::new())),
        Just(Some("   ".to_string())),
        "[A-Za-z][A-Za-z ]{0,20}".prop_map(Some),
    ]
}

/// Strategy for an authSource tag in any casing, or absent.
fn auth_source_tag() -> impl Strategy<Value = Option<String>> {
    prop_oneof![
        Just(None),
        prop::sample::select(vec!["local", "federated", "sso", "both"]).prop_flat_map(|tag| {
            prop::collection::vec(any::<bool>(), tag.len()).prop_map(move |upper| {
                Some(
                    tag.chars()
                        .zip(upper)
                        .map(|(c, u)| if u { c.to_ascii_uppercase() } else { c })
                        .collect(),
                )
            })
        }),
    ]
}

fn wire_id() -> impl Strategy<Value = WireId> {
    prop_oneof![
        any::<i64>().prop_map(WireId::Number),
        "[a-z0-9-]{1,12}".prop_map(WireId::Text),
    ]
}

prop_compose! {
    fn wire_user()(
        id in wire_id(),
        email in email(),
        name in maybe_blank(),
        display_name in maybe_blank(),
        role in proptest::option::of(0i64..10),
        auth_source in auth_source_tag(),
        object_id in proptest::option::of("[a-f0-9-]{8,36}"),
        warehouse_id in proptest::option::of(1i64..500),
    ) -> WireUser {
        WireUser {
            id: Some(id),
            email: Some(email),
            name,
            display_name,
            role,
            auth_source,
            object_id,
            warehouse_id,
            ..Default::default()
        }
    }
}

proptest! {
    #[test]
    fn normalized_name_is_never_blank(wire in wire_user()) {
        if let Ok(user) = UserRecord::from_wire(wire) {
            prop_assert!(!user.name.trim().is_empty());
            prop_assert!(!user.id.is_empty());
        }
    }

    #[test]
    fn origin_matches_tag(wire in wire_user()) {
        let tag = wire.auth_source.as_deref().map(str::to_ascii_lowercase);
        let has_object_id = wire.object_id.as_deref().is_some_and(|s| !s.trim().is_empty());

        match (tag.as_deref(), UserRecord::from_wire(wire)) {
            (None | Some("local"), Ok(user)) => {
                prop_assert_eq!(&user.origin, &UserOrigin::Local);
                prop_assert_eq!(user.auth_source(), AuthSource::Local);
            }
            (Some(_), Ok(user)) => {
                prop_assert!(has_object_id);
                prop_assert_eq!(user.auth_source(), AuthSource::Federated);
                prop_assert!(user.origin.object_id().is_some());
            }
            (Some(_), Err(err)) => {
                prop_assert!(!has_object_id);
                prop_assert_eq!(err, NormalizeError::MissingField("objectId"));
            }
            (None, Err(err)) => prop_assert!(false, "local user rejected: {}", err),
        }
    }

    #[test]
    fn saved_user_reads_back_identically(wire in wire_user()) {
        if let Ok(user) = UserRecord::from_wire(wire) {
            let json = user.to_json().unwrap();
            prop_assert_eq!(UserRecord::parse(&json).unwrap(), user);
        }
    }

    #[test]
    fn fingerprint_is_short_hex_and_stable(token in "[A-Za-z0-9._-]{1,200}") {
        let fp = fingerprint(&token);
        prop_assert_eq!(fp.len(), 12);
        prop_assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
        prop_assert_eq!(fp, fingerprint(&token));
    }

    #[test]
    fn nested_public_routes_stay_public(segment in "[a-z0-9]{1,12}", query in "[a-z=&]{0,10}") {
        let policy = RoutePolicy::default();
        let nested = Route::new(format!("/register/{}?{}", segment, query));
        let lookalike = Route::new(format!("/register{}", segment));

        prop_assert!(policy.is_public(&nested));
        prop_assert!(!policy.is_public(&lookalike));
    }
}
