//! AuthGate Mock Tests
//!
//! Token lifecycle against a mocked identity service: fast path, lazy refresh,
//! login, logout and refresh coalescing.

mod common;

use chrono::{Duration, Utc};
use clotilde_sdk::{ConsoleError, SessionState};
use common::{expired, fresh, Harness, ManualClock};
use serde_json::json;
use wiremock::{
    matchers::{body_json, header, header_exists, method, path},
    Mock, ResponseTemplate,
};

// ============================================================================
// getUsableToken
// ============================================================================

#[tokio::test]
async fn test_valid_token_is_returned_without_network() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": fresh("x@y.z")})))
        .expect(0)
        .mount(&h.identity)
        .await;

    let credential = fresh("alice@example.com");
    h.console.store().set(&credential).unwrap();

    let token = h.console.auth().get_usable_token().await.unwrap();
    assert_eq!(token.subject(), "alice@example.com");
    assert_eq!(token.credential(), credential);
}

#[tokio::test]
async fn test_expired_token_triggers_exactly_one_refresh() {
    let h = Harness::start().await;
    let renewed = fresh("alice@example.com");

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": renewed})))
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console.store().set(&expired("alice@example.com")).unwrap();
    assert_eq!(h.console.session_state(), SessionState::Expired);

    let token = h.console.auth().get_usable_token().await.unwrap();
    assert_eq!(token.credential(), renewed);
    assert_eq!(h.console.store().read().unwrap().credential(), renewed);
    assert_eq!(h.console.session_state(), SessionState::Valid);

    // The refreshed token now takes the fast path
    let again = h.console.auth().get_usable_token().await.unwrap();
    assert_eq!(again.credential(), renewed);
}

#[tokio::test]
async fn test_refresh_sends_no_bearer_header() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .and(header_exists("Authorization"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&h.identity)
        .await;
    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": fresh("alice@example.com")})))
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console.store().set(&expired("alice@example.com")).unwrap();
    assert!(h.console.auth().get_usable_token().await.is_some());
}

#[tokio::test]
async fn test_no_session_without_refresh_cookie() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.identity)
        .await;

    assert!(h.console.auth().get_usable_token().await.is_none());
    assert_eq!(h.console.session_state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_failed_refresh_clears_expired_token() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console.store().set(&expired("alice@example.com")).unwrap();
    let mut receiver = h.console.subscribe();

    assert!(h.console.auth().get_usable_token().await.is_none());
    assert!(h.console.store().read().is_none());
    assert!(receiver.has_changed().unwrap());
    assert_eq!(h.console.session_state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_refresh_with_empty_or_null_body_is_no_session() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200))
        .up_to_n_times(1)
        .expect(1)
        .mount(&h.identity)
        .await;
    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "application/json")
                .set_body_string("null"),
        )
        .expect(1)
        .mount(&h.identity)
        .await;

    assert!(h.console.auth().get_usable_token().await.is_none());
    assert!(h.console.auth().get_usable_token().await.is_none());
}

#[tokio::test]
async fn test_refresh_with_malformed_credential_is_no_session() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "garbage"})))
        .expect(2)
        .mount(&h.identity)
        .await;

    assert!(h.console.auth().get_usable_token().await.is_none());

    // `refresh` itself reports the detail
    let detail = h.console.auth().refresh().await;
    assert!(matches!(detail, Err(ConsoleError::Decode(_))));
}

#[tokio::test]
async fn test_unreachable_identity_service_is_no_session() {
    let h = Harness::start().await;
    let uri = h.identity.uri();
    drop(h.identity);

    let config = clotilde_sdk::ConsoleConfig::new(uri, h.api.uri()).unwrap();
    let console = clotilde_sdk::Console::new(&config).unwrap();

    assert!(console.auth().get_usable_token().await.is_none());
}

#[tokio::test]
async fn test_expiry_is_detected_lazily() {
    let clock = ManualClock::new(Utc::now());
    let h = Harness::start_with_clock(clock.clone()).await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": fresh("alice@example.com")})))
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console
        .store()
        .set(&common::mint("alice@example.com", Utc::now() + Duration::minutes(5)))
        .unwrap();

    assert!(h.console.auth().get_usable_token().await.is_some());
    assert_eq!(h.console.session_state(), SessionState::Valid);

    clock.advance(Duration::minutes(10));
    assert_eq!(h.console.session_state(), SessionState::Expired);

    assert!(h.console.auth().get_usable_token().await.is_some());
}

#[tokio::test]
async fn test_concurrent_refreshes_are_coalesced() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"token": fresh("alice@example.com")}))
                .set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console.store().set(&expired("alice@example.com")).unwrap();

    let gate = h.console.auth();
    let (first, second) = tokio::join!(gate.get_usable_token(), gate.get_usable_token());

    assert_eq!(first.unwrap(), second.unwrap());
}

#[tokio::test]
async fn test_concurrent_failed_refreshes_are_coalesced() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console.store().set(&expired("alice@example.com")).unwrap();

    let gate = h.console.auth();
    let (first, second, third) = tokio::join!(
        gate.get_usable_token(),
        gate.get_usable_token(),
        gate.get_usable_token()
    );

    assert!(first.is_none());
    assert!(second.is_none());
    assert!(third.is_none());
    assert_eq!(h.console.session_state(), SessionState::Unauthenticated);
}

#[tokio::test]
async fn test_get_usable_token_shares_explicit_refresh() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(
            ResponseTemplate::new(401).set_delay(std::time::Duration::from_millis(100)),
        )
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console.store().set(&expired("alice@example.com")).unwrap();

    let gate = h.console.auth();
    let (refreshed, usable) = tokio::join!(gate.refresh(), gate.get_usable_token());

    assert!(refreshed.unwrap().is_none());
    assert!(usable.is_none());
}

#[tokio::test]
async fn test_sequential_failed_refreshes_each_contact_identity_service() {
    let h = Harness::start().await;

    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(2)
        .mount(&h.identity)
        .await;

    assert!(h.console.auth().get_usable_token().await.is_none());
    assert!(h.console.auth().get_usable_token().await.is_none());
}

// ============================================================================
// login
// ============================================================================

#[tokio::test]
async fn test_login_then_fast_path() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(header("Content-Type", "application/json"))
        .and(body_json(json!({"email": "a@b.c", "password": "pw"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": fresh("a@b.c")})))
        .expect(1)
        .mount(&h.identity)
        .await;
    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(0)
        .mount(&h.identity)
        .await;

    let logged_in = h.console.auth().login("a@b.c", "pw").await.unwrap();
    assert_eq!(logged_in.subject(), "a@b.c");

    let token = h.console.auth().get_usable_token().await.unwrap();
    assert_eq!(token.subject(), "a@b.c");
}

#[tokio::test]
async fn test_login_notifies_subscribers() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": fresh("a@b.c")})))
        .mount(&h.identity)
        .await;

    let mut receiver = h.console.subscribe();
    h.console.auth().login("a@b.c", "pw").await.unwrap();

    assert!(receiver.has_changed().unwrap());
    let seen = receiver.borrow_and_update().clone().unwrap();
    assert_eq!(seen.subject(), "a@b.c");
}

#[tokio::test]
async fn test_login_rejected() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid credentials"))
        .expect(1)
        .mount(&h.identity)
        .await;

    let result = h.console.auth().login("a@b.c", "wrong").await;

    match result {
        Err(ConsoleError::Authentication(failure)) => {
            assert_eq!(failure.status, 401);
            assert_eq!(failure.status_text, "Unauthorized");
            assert!(failure.url.ends_with("/login"));
        }
        other => panic!("Expected authentication error, got {:?}", other),
    }
    assert!(h.console.store().read().is_none());
}

#[tokio::test]
async fn test_login_with_malformed_credential() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": "nope"})))
        .mount(&h.identity)
        .await;

    let result = h.console.auth().login("a@b.c", "pw").await;
    assert!(matches!(result, Err(ConsoleError::Decode(_))));
    assert!(h.console.store().read().is_none());
}

#[tokio::test]
async fn test_refresh_cookie_from_login_is_sent_on_refresh() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "token=refresh-abc; Path=/; HttpOnly")
                .set_body_json(json!({"token": expired("a@b.c")})),
        )
        .mount(&h.identity)
        .await;
    Mock::given(method("GET"))
        .and(path("/refresh"))
        .and(header("cookie", "token=refresh-abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": fresh("a@b.c")})))
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console.auth().login("a@b.c", "pw").await.unwrap();

    let token = h.console.auth().get_usable_token().await.unwrap();
    assert_eq!(token.subject(), "a@b.c");
    assert!(token.is_usable_at(Utc::now()));
}

// ============================================================================
// logout
// ============================================================================

#[tokio::test]
async fn test_logout_clears_store_and_next_request_refreshes() {
    let h = Harness::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"token": fresh("a@b.c")})))
        .mount(&h.identity)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&h.identity)
        .await;
    Mock::given(method("GET"))
        .and(path("/refresh"))
        .respond_with(ResponseTemplate::new(401))
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console.auth().login("a@b.c", "pw").await.unwrap();
    let mut receiver = h.console.subscribe();

    h.console.auth().logout().await.unwrap();

    assert!(h.console.store().read().is_none());
    assert!(receiver.has_changed().unwrap());
    assert!(h.console.auth().get_usable_token().await.is_none());
}

#[tokio::test]
async fn test_logout_failure_keeps_token() {
    let h = Harness::start().await;

    Mock::given(method("DELETE"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&h.identity)
        .await;

    h.console.store().set(&fresh("a@b.c")).unwrap();

    let result = h.console.auth().logout().await;

    match result {
        Err(err @ ConsoleError::Logout { .. }) => {
            assert_eq!(err.status(), Some(500));
            assert!(err.to_string().contains("Internal Server Error"));
        }
        other => panic!("Expected logout error, got {:?}", other),
    }
    assert!(h.console.store().read().is_some());
}

#[tokio::test]
async fn test_logout_unreachable_is_logout_error() {
    let h = Harness::start().await;
    let uri = h.identity.uri();
    drop(h.identity);

    let config = clotilde_sdk::ConsoleConfig::new(uri, h.api.uri()).unwrap();
    let console = clotilde_sdk::Console::new(&config).unwrap();
    console.store().set(&fresh("a@b.c")).unwrap();

    let result = console.auth().logout().await;

    match result {
        Err(ConsoleError::Logout { status, reason }) => {
            assert_eq!(status, None);
            assert!(!reason.is_empty());
        }
        other => panic!("Expected logout error, got {:?}", other),
    }
    assert!(console.store().read().is_some());
}

#[tokio::test]
async fn test_login_unreachable_is_network_error() {
    let h = Harness::start().await;
    let uri = h.identity.uri();
    drop(h.identity);

    let config = clotilde_sdk::ConsoleConfig::new(uri, h.api.uri()).unwrap();
    let console = clotilde_sdk::Console::new(&config).unwrap();

    let result = console.auth().login("a@b.c", "pw").await;

    assert!(matches!(result, Err(ConsoleError::Network(_))));
    assert!(console.store().read().is_none());
}
