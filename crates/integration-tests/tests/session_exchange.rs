//! End-to-end tests for the credential exchange endpoints.
//!
//! Each test runs the portal router against its own stub backend and checks
//! both the browser-facing response and the request the backend received.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use axum::http::StatusCode;
use serde_json::{Value, json};
use warizmy_integration_tests::{TestPortal, get, post_json};

const LOGIN: &str = "/api/auth/login";
const ME: &str = "/api/auth/me";
const REFRESH: &str = "/api/auth/refresh";
const REGISTER: &str = "/api/auth/register";

fn user(first_name: &str) -> Value {
    json!({
        "id": "0b7c6f1e-2f4e-4c55-9d2a-8d1f0c7e3a11",
        "email": "amina@example.de",
        "first_name": first_name,
        "last_name": "Yilmaz",
        "role": "student",
        "is_active": true,
        "email_verified": true,
        "onboarding_completed": false,
        "created_at": "2024-03-01T09:30:00"
    })
}

// ============================================================================
// Login
// ============================================================================

#[tokio::test]
async fn test_login_forwards_form_encoded_credentials() {
    let portal = TestPortal::start().await;
    portal.upstream.respond_json(
        LOGIN,
        StatusCode::OK,
        &json!({ "access_token": "acc-1", "refresh_token": "ref-1", "token_type": "bearer" }),
    );

    portal
        .send(post_json(
            LOGIN,
            None,
            r#"{"email":"  amina@example.de ","password":"p@ss w&rd"}"#,
        ))
        .await;

    let requests = portal.upstream.requests_to(LOGIN);
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.method, "POST");
    assert_eq!(
        request.header("content-type"),
        Some("application/x-www-form-urlencoded")
    );
    assert_eq!(
        request.body_text(),
        "username=amina%40example.de&password=p%40ss+w%26rd"
    );
}

#[tokio::test]
async fn test_login_makes_a_single_backend_call() {
    let portal = TestPortal::start().await;
    portal.upstream.respond_json(
        LOGIN,
        StatusCode::OK,
        &json!({ "access_token": "acc-1", "refresh_token": "ref-1", "token_type": "bearer" }),
    );

    portal
        .send(post_json(LOGIN, None, r#"{"email":"amina@example.de","password":"pw"}"#))
        .await;

    let paths: Vec<_> = portal.upstream.requests().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec![LOGIN.to_string()]);
}

#[tokio::test]
async fn test_login_success_sets_cookies_and_relays_body() {
    let portal = TestPortal::start().await;
    let body = json!({ "access_token": "acc-1", "refresh_token": "ref-1", "token_type": "bearer" });
    portal.upstream.respond_json(LOGIN, StatusCode::OK, &body);

    let response = portal
        .send(post_json(LOGIN, None, r#"{"email":"amina@example.de","password":"pw"}"#))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), body);

    let access = response.set_cookie("warizmy_access_token").unwrap();
    assert!(access.starts_with("warizmy_access_token=acc-1"));
    assert!(access.contains("HttpOnly"));
    assert!(access.contains("SameSite=Lax"));
    assert!(access.contains("Path=/"));
    assert!(access.contains("Max-Age=1800"));
    assert!(!access.contains("Secure"));

    let refresh = response.set_cookie("warizmy_refresh_token").unwrap();
    assert!(refresh.starts_with("warizmy_refresh_token=ref-1"));
    assert!(refresh.contains("Max-Age=604800"));
}

#[tokio::test]
async fn test_login_cookies_are_secure_over_https() {
    let portal = TestPortal::start_https().await;
    portal.upstream.respond_json(
        LOGIN,
        StatusCode::OK,
        &json!({ "access_token": "acc-1", "refresh_token": "ref-1" }),
    );

    let response = portal
        .send(post_json(LOGIN, None, r#"{"email":"a@b.de","password":"pw"}"#))
        .await;

    assert!(response.set_cookie("warizmy_access_token").unwrap().contains("Secure"));
    assert!(response.set_cookie("warizmy_refresh_token").unwrap().contains("Secure"));
}

#[tokio::test]
async fn test_login_rejection_is_relayed_without_cookies() {
    let portal = TestPortal::start().await;
    let body = json!({ "detail": "E-Mail oder Passwort ist falsch" });
    portal.upstream.respond_json(LOGIN, StatusCode::UNAUTHORIZED, &body);

    let response = portal
        .send(post_json(LOGIN, None, r#"{"email":"a@b.de","password":"wrong"}"#))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), body);
    assert!(response.set_cookies().is_empty());
}

#[tokio::test]
async fn test_login_malformed_body_sends_empty_credentials() {
    let portal = TestPortal::start().await;
    portal.upstream.respond_json(
        LOGIN,
        StatusCode::UNPROCESSABLE_ENTITY,
        &json!({ "detail": "field required" }),
    );

    let response = portal.send(post_json(LOGIN, None, "not json")).await;

    assert_eq!(response.status, StatusCode::UNPROCESSABLE_ENTITY);
    let requests = portal.upstream.requests_to(LOGIN);
    assert_eq!(requests[0].body_text(), "username=&password=");
}

// ============================================================================
// Current Identity
// ============================================================================

#[tokio::test]
async fn test_me_without_cookie_never_calls_backend() {
    let portal = TestPortal::start().await;

    let response = portal.send(get(ME, None)).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({ "detail": "Not authenticated" }));
    assert!(portal.upstream.requests().is_empty());
}

#[tokio::test]
async fn test_me_sends_bearer_token_without_caching() {
    let portal = TestPortal::start().await;
    portal.upstream.respond_json(ME, StatusCode::OK, &user("Amina"));

    let response = portal.send(get(ME, Some("warizmy_access_token=acc-1"))).await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), user("Amina"));
    assert_eq!(response.header("cache-control"), Some("no-store"));

    let requests = portal.upstream.requests_to(ME);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "GET");
    assert_eq!(requests[0].header("authorization"), Some("Bearer acc-1"));
    assert_eq!(requests[0].header("cache-control"), Some("no-cache, no-store"));
}

#[tokio::test]
async fn test_me_always_reflects_backend_state() {
    let portal = TestPortal::start().await;
    let cookie = Some("warizmy_access_token=acc-1");

    portal.upstream.respond_json(ME, StatusCode::OK, &user("Amina"));
    let first = portal.send(get(ME, cookie)).await;

    portal.upstream.respond_json(ME, StatusCode::OK, &user("Aminah"));
    let second = portal.send(get(ME, cookie)).await;

    assert_eq!(first.json()["first_name"], "Amina");
    assert_eq!(second.json()["first_name"], "Aminah");
    assert_eq!(portal.upstream.requests_to(ME).len(), 2);
}

#[tokio::test]
async fn test_me_repeated_calls_are_identical() {
    let portal = TestPortal::start().await;
    portal.upstream.respond_json(ME, StatusCode::OK, &user("Amina"));
    let cookie = Some("warizmy_access_token=acc-1");

    let first = portal.send(get(ME, cookie)).await;
    let second = portal.send(get(ME, cookie)).await;

    assert_eq!(first.status, second.status);
    assert_eq!(first.json(), second.json());
    assert!(first.set_cookies().is_empty());
    assert!(second.set_cookies().is_empty());
}

#[tokio::test]
async fn test_me_relays_expired_token_rejection() {
    let portal = TestPortal::start().await;
    let body = json!({ "detail": "Token abgelaufen" });
    portal.upstream.respond_json(ME, StatusCode::UNAUTHORIZED, &body);

    let response = portal.send(get(ME, Some("warizmy_access_token=stale"))).await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), body);
}

// ============================================================================
// Refresh
// ============================================================================

#[tokio::test]
async fn test_refresh_without_cookie_never_calls_backend() {
    let portal = TestPortal::start().await;

    let response = portal
        .send(post_json(REFRESH, Some("warizmy_access_token=acc-1"), ""))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), json!({ "detail": "No refresh token" }));
    assert!(portal.upstream.requests().is_empty());
}

#[tokio::test]
async fn test_refresh_sends_token_as_json_string() {
    let portal = TestPortal::start().await;
    portal.upstream.respond_json(
        REFRESH,
        StatusCode::OK,
        &json!({ "access_token": "acc-2", "refresh_token": "ref-2" }),
    );

    let response = portal
        .send(post_json(REFRESH, Some("warizmy_refresh_token=r3fr35h-t0k3n"), ""))
        .await;

    let requests = portal.upstream.requests_to(REFRESH);
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].body_text(), r#""r3fr35h-t0k3n""#);
    assert_eq!(requests[0].header("content-type"), Some("application/json"));

    assert_eq!(response.status, StatusCode::OK);
    assert!(
        response
            .set_cookie("warizmy_access_token")
            .unwrap()
            .starts_with("warizmy_access_token=acc-2")
    );
    assert!(
        response
            .set_cookie("warizmy_refresh_token")
            .unwrap()
            .starts_with("warizmy_refresh_token=ref-2")
    );
}

#[tokio::test]
async fn test_refresh_keeps_refresh_cookie_when_not_rotated() {
    let portal = TestPortal::start().await;
    portal
        .upstream
        .respond_json(REFRESH, StatusCode::OK, &json!({ "access_token": "acc-2" }));

    let response = portal
        .send(post_json(REFRESH, Some("warizmy_refresh_token=ref-1"), ""))
        .await;

    assert!(response.set_cookie("warizmy_access_token").is_some());
    assert!(response.set_cookie("warizmy_refresh_token").is_none());
}

#[tokio::test]
async fn test_refresh_rejection_leaves_cookies_alone() {
    let portal = TestPortal::start().await;
    let body = json!({ "detail": "Invalid refresh token" });
    portal.upstream.respond_json(REFRESH, StatusCode::UNAUTHORIZED, &body);

    let response = portal
        .send(post_json(REFRESH, Some("warizmy_refresh_token=revoked"), ""))
        .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.json(), body);
    assert!(response.set_cookies().is_empty());
}

// ============================================================================
// Register
// ============================================================================

#[tokio::test]
async fn test_register_forwards_payload_verbatim() {
    let portal = TestPortal::start().await;
    let created = json!({ "id": "42", "email": "neu@example.de" });
    portal.upstream.respond_json(REGISTER, StatusCode::CREATED, &created);

    let payload = json!({
        "email": "neu@example.de",
        "password": "Sicher123!",
        "first_name": "Yusuf",
        "last_name": "Demir",
        "newsletter_opt_in": true
    });
    let response = portal
        .send(post_json(REGISTER, None, &payload.to_string()))
        .await;

    assert_eq!(response.status, StatusCode::CREATED);
    assert_eq!(response.json(), created);

    let requests = portal.upstream.requests_to(REGISTER);
    let forwarded: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(forwarded, payload);
    assert_eq!(requests[0].header("content-type"), Some("application/json"));
}

#[tokio::test]
async fn test_register_relays_validation_errors() {
    let portal = TestPortal::start().await;
    let body = json!({ "detail": "Email already registered" });
    portal.upstream.respond_json(REGISTER, StatusCode::BAD_REQUEST, &body);

    let response = portal
        .send(post_json(REGISTER, None, r#"{"email":"alt@example.de"}"#))
        .await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.json(), body);
}

#[tokio::test]
async fn test_register_invalid_json_fails_without_backend_call() {
    let portal = TestPortal::start().await;

    let response = portal.send(post_json(REGISTER, None, "{\"email\":")).await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.json(), json!({ "detail": "Register failed" }));
    assert!(portal.upstream.requests().is_empty());
}

// ============================================================================
// Logout
// ============================================================================

#[tokio::test]
async fn test_logout_expires_both_cookies() {
    let portal = TestPortal::start().await;

    let response = portal
        .send(post_json(
            "/api/auth/logout",
            Some("warizmy_access_token=a; warizmy_refresh_token=r"),
            "",
        ))
        .await;

    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.json(), json!({ "detail": "Logged out" }));
    for name in ["warizmy_access_token", "warizmy_refresh_token"] {
        let cookie = response.set_cookie(name).unwrap();
        assert!(cookie.contains("Max-Age=0"), "{cookie}");
    }
    assert!(portal.upstream.requests().is_empty());
}

// ============================================================================
// Request Correlation
// ============================================================================

#[tokio::test]
async fn test_request_id_is_forwarded_to_backend() {
    let portal = TestPortal::start().await;
    portal.upstream.respond_json(ME, StatusCode::OK, &user("Amina"));

    let mut request = get(ME, Some("warizmy_access_token=acc-1"));
    request
        .headers_mut()
        .insert("x-request-id", "edge-7f3a".parse().unwrap());
    let response = portal.send(request).await;

    assert_eq!(response.header("x-request-id"), Some("edge-7f3a"));
    assert_eq!(
        portal.upstream.requests_to(ME)[0].header("x-request-id"),
        Some("edge-7f3a")
    );
}
