mod support;

use std::cell::Cell;
use std::rc::Rc;

use growweek_core::transport::{ApiRequest, HttpMethod};
use growweek_core::{BoardError, CredentialStore, ErrorKind};
use serde_json::json;
use support::{MockBackend, harness, ok, rejected, unauthorized};

const REFRESH: &str = "/api/v1/auth/refresh";
const CURRENT_WEEK: &str = "/api/v1/tasks/current-week";

fn bearer(request: &growweek_core::transport::HttpRequest) -> Option<&str> {
    request.header("Authorization")
}

#[tokio::test]
async fn concurrent_failures_share_one_renewal() {
    let backend = MockBackend::new(|request| {
        if request.url.ends_with(REFRESH) {
            return ok(json!({ "accessToken": "fresh" }));
        }
        match bearer(request) {
            Some("Bearer fresh") => ok(json!([])),
            _ => unauthorized(),
        }
    });
    let h = harness(backend, Some("stale"), "/");
    let session = &h.client.session;
    let request = ApiRequest::get("/tasks/current-week");

    let (a, b, c) = futures::join!(
        session.authorized_request(&request),
        session.authorized_request(&request),
        session.authorized_request(&request),
    );

    for result in [a, b, c] {
        assert_eq!(result.expect("retried").status, 200);
    }
    assert_eq!(h.backend.count(HttpMethod::Post, REFRESH), 1);
    assert_eq!(session.renewals_started(), 1);
    assert_eq!(h.backend.count(HttpMethod::Get, CURRENT_WEEK), 6);
    assert_eq!(h.credentials.get().as_deref(), Some("fresh"));
    assert!(!session.is_renewing());
    assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn renewal_without_new_token_still_retries() {
    let attempts = Rc::new(Cell::new(0));
    let seen = Rc::clone(&attempts);
    let backend = MockBackend::new(move |request| {
        if request.url.ends_with(REFRESH) {
            return Ok(growweek_core::transport::HttpResponse::new(200, ""));
        }
        seen.set(seen.get() + 1);
        if seen.get() == 1 {
            unauthorized()
        } else {
            ok(json!([]))
        }
    });
    let h = harness(backend, Some("cookie-backed"), "/");

    let response = h
        .client
        .session
        .authorized_request(&ApiRequest::get("/tasks/current-week"))
        .await
        .expect("retried");

    assert_eq!(response.status, 200);
    assert_eq!(attempts.get(), 2);
    assert_eq!(h.credentials.get().as_deref(), Some("cookie-backed"));
}

#[tokio::test]
async fn second_unauthorized_is_terminal() {
    let backend = MockBackend::new(|request| {
        if request.url.ends_with(REFRESH) {
            return ok(json!({ "token": "fresh" }));
        }
        unauthorized()
    });
    let h = harness(backend, Some("stale"), "/board");

    let err = h
        .client
        .session
        .authorized_request(&ApiRequest::get("/tasks/current-week"))
        .await
        .expect_err("terminal");

    assert_eq!(err, BoardError::AuthorizationTerminal);
    assert_eq!(h.backend.count(HttpMethod::Get, CURRENT_WEEK), 2);
    assert_eq!(h.backend.count(HttpMethod::Post, REFRESH), 1);
    assert_eq!(h.credentials.get(), None);
    assert_eq!(h.navigator.visits(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn failed_renewal_ends_session_once_for_all_waiters() {
    let backend = MockBackend::new(|request| {
        if request.url.ends_with(REFRESH) {
            return rejected(401, "REFRESH_EXPIRED", "refresh token expired");
        }
        unauthorized()
    });
    let h = harness(backend, Some("stale"), "/");
    let session = &h.client.session;
    let request = ApiRequest::get("/tasks/current-week");

    let (a, b) = futures::join!(
        session.authorized_request(&request),
        session.authorized_request(&request),
    );

    assert_eq!(a.expect_err("terminal").kind(), ErrorKind::AuthorizationTerminal);
    assert_eq!(b.expect_err("terminal").kind(), ErrorKind::AuthorizationTerminal);
    assert_eq!(h.backend.count(HttpMethod::Post, REFRESH), 1);
    assert_eq!(h.navigator.visits(), vec!["/login".to_string()]);
    assert_eq!(h.credentials.get(), None);
}

#[tokio::test]
async fn renewal_network_error_is_terminal() {
    let backend = MockBackend::new(|request| {
        if request.url.ends_with(REFRESH) {
            return Err("connection reset".to_string());
        }
        unauthorized()
    });
    let h = harness(backend, Some("stale"), "/");

    let err = h
        .client
        .session
        .authorized_request(&ApiRequest::get("/auth/me"))
        .await
        .expect_err("terminal");

    assert_eq!(err, BoardError::AuthorizationTerminal);
    assert_eq!(h.navigator.visits(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn no_redirect_when_already_on_sign_in() {
    let backend = MockBackend::new(|request| {
        if request.url.ends_with(REFRESH) {
            return Ok(growweek_core::transport::HttpResponse::new(500, ""));
        }
        unauthorized()
    });
    let h = harness(backend, Some("stale"), "/login");

    let err = h
        .client
        .session
        .authorized_request(&ApiRequest::get("/auth/me"))
        .await
        .expect_err("terminal");

    assert_eq!(err, BoardError::AuthorizationTerminal);
    assert!(h.navigator.visits().is_empty());
    assert_eq!(h.credentials.get(), None);
}

#[tokio::test]
async fn rejected_login_never_renews() {
    let backend = MockBackend::new(|request| {
        if request.url.ends_with("/auth/login") {
            return rejected(401, "INVALID_CREDENTIALS", "wrong email or password");
        }
        ok(json!({}))
    });
    let h = harness(backend, None, "/login");

    let err = h
        .client
        .auth
        .login("ada@example.com", "nope")
        .await
        .expect_err("rejected");

    assert_eq!(err.kind(), ErrorKind::ServerRejected);
    assert_eq!(err.user_message(), "wrong email or password");
    assert_eq!(h.backend.count(HttpMethod::Post, REFRESH), 0);
    assert!(h.navigator.visits().is_empty());
}

#[tokio::test]
async fn login_stores_token_and_logout_clears_it() {
    let backend = MockBackend::new(|request| {
        if request.url.ends_with("/auth/login") {
            return ok(json!({
                "userId": 3,
                "email": "ada@example.com",
                "name": "Ada",
                "token": "t-1"
            }));
        }
        if request.url.ends_with("/auth/logout") {
            return ok(json!(null));
        }
        ok(json!({}))
    });
    let h = harness(backend, None, "/login");

    assert_eq!(h.client.auth.route_guard("/login"), None);
    let login = h
        .client
        .auth
        .login(" ada@example.com ", "secret")
        .await
        .expect("login");
    assert_eq!(login.user_id, 3);
    assert_eq!(h.credentials.get().as_deref(), Some("t-1"));
    assert_eq!(h.client.auth.route_guard("/login"), Some("/".to_string()));

    let login_request = h.backend.calls()[0].clone();
    assert_eq!(
        support::body_json(&login_request)["email"],
        json!("ada@example.com")
    );

    h.client.auth.logout().await.expect("logout");
    assert_eq!(h.credentials.get(), None);
    assert!(!h.client.auth.is_signed_in());
    assert_eq!(h.client.auth.route_guard("/"), Some("/login".to_string()));
}

#[tokio::test]
async fn logout_clears_credential_even_when_server_fails() {
    let backend = MockBackend::new(|_| Err("offline".to_string()));
    let h = harness(backend, Some("t-1"), "/");

    let err = h.client.auth.logout().await.expect_err("offline");

    assert_eq!(err.kind(), ErrorKind::TransportFailure);
    assert_eq!(h.credentials.get(), None);
    assert_eq!(h.navigator.visits(), vec!["/login".to_string()]);
}

#[tokio::test]
async fn empty_credentials_fail_validation_without_calls() {
    let backend = MockBackend::new(|_| ok(json!({})));
    let h = harness(backend, None, "/register");

    let err = h
        .client
        .auth
        .register("ada@example.com", "secret", "  ")
        .await
        .expect_err("validation");

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(h.backend.total(), 0);
}
