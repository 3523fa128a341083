//! End-to-end behaviour of the authorization pipeline in front of the dispatcher.
//!
//! Every test goes through the full router: HTTP layers, the three stages and the
//! routes, driven with `tower::ServiceExt::oneshot`.

mod common;

use std::time::Duration;

use axum::http::StatusCode;
use common::{
    ADMIN_TOKEN, DOWN_TOKEN, EMPTY_ROLE_TOKEN, NO_ROLE_TOKEN, ODD_ROLE_TOKEN, SLOW_TOKEN, USER_TOKEN,
    app, bearer, body_json, body_text, request,
};
use tenant_gate::config::UpstreamPolicy;
use tenant_gate::services::route_policy::RoutePolicy;

#[tokio::test]
async fn missing_authorization_is_401_without_calling_the_verifier() {
    let app = app().build();

    let response = app.send(request("/user", None, Some("tenant1"))).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.verifier.calls(), 0);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn non_bearer_scheme_is_401_without_calling_the_verifier() {
    let app = app().build();

    for value in ["Basic dXNlcjpwYXNz", "valid_token", "Bearer", "Bearer   "] {
        let response = app.send(request("/user", Some(value), Some("tenant1"))).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{value:?}");
    }
    assert_eq!(app.verifier.calls(), 0);
}

#[tokio::test]
async fn unknown_credential_is_401() {
    let app = app().build();

    assert_eq!(app.status("/user", "invalid_token", "tenant1").await, StatusCode::UNAUTHORIZED);
    assert_eq!(app.verifier.calls(), 1);
}

#[tokio::test]
async fn scheme_is_matched_case_insensitively() {
    let app = app().build();
    let value = format!("bEaReR {USER_TOKEN}");

    let response = app.send(request("/user", Some(&value), Some("tenant1"))).await;

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn valid_credential_without_tenant_header_is_400() {
    let app = app().build();

    let response = app.send(request("/user", Some(&bearer(USER_TOKEN)), None)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app.send(request("/user", Some(&bearer(USER_TOKEN)), Some("  "))).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn authentication_runs_before_tenancy() {
    let app = app().build();

    // Both headers missing: the credential failure wins.
    let response = app.send(request("/user", None, None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_reaches_admin_route() {
    let app = app().build();

    let response = app.get("/admin", ADMIN_TOKEN, "tenant1").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["adminId"], "admin-1");
    assert_eq!(body["tenantId"], "tenant1");
}

#[tokio::test]
async fn foreign_tenant_is_stopped_at_tenancy_with_401() {
    let app = app().build();

    assert_eq!(app.status("/admin", ADMIN_TOKEN, "tenant2").await, StatusCode::UNAUTHORIZED);
    assert_eq!(app.status("/user", USER_TOKEN, "tenant2").await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn foreign_tenant_without_cross_check_is_403_at_authorization() {
    let app = app().cross_check(false).build();

    assert_eq!(app.status("/admin", ADMIN_TOKEN, "tenant2").await, StatusCode::FORBIDDEN);
    assert_eq!(app.status("/admin", ADMIN_TOKEN, "tenant1").await, StatusCode::OK);
}

#[tokio::test]
async fn user_reaches_own_profile() {
    let app = app().build();

    let response = app.get("/user", USER_TOKEN, "tenant1").await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["id"], "user-1");
    assert_eq!(body["role"], "user");
    assert_eq!(body["tenantId"], "tenant1");
    assert_eq!(body["email"], "user@example.com");
}

#[tokio::test]
async fn user_is_denied_admin_route() {
    let app = app().build();

    let response = app.get("/admin", USER_TOKEN, "tenant1").await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "FORBIDDEN");
    // Decision details stay in the logs.
    assert!(!body.to_string().contains("user-1"));
}

#[tokio::test]
async fn user_allow_list_covers_public_routes() {
    let app = app().build();

    for path in ["/", "/health", "/version", "/user"] {
        assert_eq!(app.status(path, USER_TOKEN, "tenant1").await, StatusCode::OK, "{path}");
    }
    assert_eq!(
        app.status("/companies/search?query=apple", USER_TOKEN, "tenant1").await,
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn role_claims_are_interpreted_once() {
    let app = app().build();

    // Absent role defaults to "user".
    assert_eq!(app.status("/user", NO_ROLE_TOKEN, "tenant1").await, StatusCode::OK);
    assert_eq!(app.status("/admin", NO_ROLE_TOKEN, "tenant1").await, StatusCode::FORBIDDEN);
    // Empty role is an authentication failure.
    assert_eq!(app.status("/user", EMPTY_ROLE_TOKEN, "tenant1").await, StatusCode::UNAUTHORIZED);
    // Unknown roles are denied everywhere.
    assert_eq!(app.status("/", ODD_ROLE_TOKEN, "tenant1").await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_route_is_404_for_admin_and_403_for_user() {
    let app = app().build();

    let response = app.get("/no/such/route", ADMIN_TOKEN, "tenant1").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "NOT_FOUND");

    assert_eq!(app.status("/no/such/route", USER_TOKEN, "tenant1").await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn unknown_route_without_credential_is_401_not_404() {
    let app = app().build();

    let response = app.send(request("/no/such/route", None, None)).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dispatcher_public_routes() {
    let app = app().build();

    let response = app.get("/", USER_TOKEN, "tenant1").await;
    assert_eq!(body_text(response).await, "Welcome to the Financial Data Platform API");

    let body = body_json(app.get("/health", USER_TOKEN, "tenant1").await).await;
    assert_eq!(body["status"], "healthy");

    let body = body_json(app.get("/version", USER_TOKEN, "tenant1").await).await;
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn company_search_for_admin() {
    let app = app().build();

    let response = app.get("/companies/search?query=apple", ADMIN_TOKEN, "tenant1").await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["results"][0]["symbol"], "AAPL");
    assert_eq!(body["results"][0]["securityName"], "Apple Inc.");
    assert!(body["next_url"].is_null());

    let response = app.get("/companies/search?query=corp&limit=1", ADMIN_TOKEN, "tenant1").await;
    assert_eq!(body_json(response).await["count"], 1);

    let response = app.get("/companies/search?query=corp&limit=abc", ADMIN_TOKEN, "tenant1").await;
    assert_eq!(body_json(response).await["count"], 2);

    let response = app.get("/companies/search", ADMIN_TOKEN, "tenant1").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn custom_route_policy_changes_access() {
    let policy = RoutePolicy::from_json(r#"{ "admin": ["/admin"], "user": ["/user", "/companies/*"] }"#)
        .expect("policy");
    let app = app().route_policy(policy).build();

    assert_eq!(
        app.status("/companies/search?query=apple", USER_TOKEN, "tenant1").await,
        StatusCode::OK
    );
    assert_eq!(app.status("/health", ADMIN_TOKEN, "tenant1").await, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn every_response_carries_a_request_id() {
    let app = app().build();

    let ok = app.get("/user", USER_TOKEN, "tenant1").await;
    let rejected = app.send(request("/user", None, None)).await;

    assert!(ok.headers().contains_key("x-request-id"));
    assert!(rejected.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unavailable_backend_defaults_to_401() {
    let app = app().build();

    assert_eq!(app.status("/user", DOWN_TOKEN, "tenant1").await, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unavailable_backend_can_map_to_504() {
    let app = app().upstream_policy(UpstreamPolicy::GatewayTimeout).build();

    let response = app.get("/user", DOWN_TOKEN, "tenant1").await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "GATEWAY_TIMEOUT");
    assert!(!body.to_string().contains("connection refused"));
}

#[tokio::test]
async fn slow_backend_is_abandoned_at_the_verify_deadline() {
    let app = app()
        .verify_timeout(Duration::from_millis(50))
        .upstream_policy(UpstreamPolicy::GatewayTimeout)
        .build();

    let started = std::time::Instant::now();
    let status = app.status("/user", SLOW_TOKEN, "tenant1").await;

    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(app.verifier.calls(), 1);
}

#[tokio::test]
async fn request_deadline_during_verification_follows_upstream_policy() {
    let app = app()
        .request_timeout(Duration::from_millis(100))
        .verify_timeout(Duration::from_secs(5))
        .upstream_policy(UpstreamPolicy::GatewayTimeout)
        .build();

    let response = app.get("/user", SLOW_TOKEN, "tenant1").await;

    assert_eq!(response.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(response.headers().contains_key("x-request-id"));
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "GATEWAY_TIMEOUT");
    assert_eq!(app.verifier.calls(), 1);
}

#[tokio::test]
async fn request_deadline_defaults_to_401() {
    let app = app()
        .request_timeout(Duration::from_millis(100))
        .verify_timeout(Duration::from_secs(5))
        .build();

    assert_eq!(app.status("/user", SLOW_TOKEN, "tenant1").await, StatusCode::UNAUTHORIZED);
}
