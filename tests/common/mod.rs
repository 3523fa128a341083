//! Shared fixtures for the HTTP-level tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header::AUTHORIZATION},
    response::Response,
};
use tenant_gate::app::build_router;
use tenant_gate::config::UpstreamPolicy;
use tenant_gate::middleware::auth::{AccessControl, AuthPipeline, Authenticator, TenantResolver};
use tenant_gate::services::identity::{IdentityVerifier, StaticTokenVerifier, VerifiedIdentity, VerifyError};
use tenant_gate::services::route_policy::RoutePolicy;
use tenant_gate::state::AppState;
use tower::ServiceExt;

pub const ADMIN_TOKEN: &str = "valid-admin-token";
pub const USER_TOKEN: &str = "valid-user-token";
pub const NO_ROLE_TOKEN: &str = "valid-no-role-token";
pub const EMPTY_ROLE_TOKEN: &str = "valid-empty-role-token";
pub const ODD_ROLE_TOKEN: &str = "valid-odd-role-token";
pub const SLOW_TOKEN: &str = "slow-token";
pub const DOWN_TOKEN: &str = "backend-down-token";

/// Static table plus two failure modes, counting every call.
pub struct CountingVerifier {
    table: StaticTokenVerifier,
    calls: AtomicUsize,
}

impl CountingVerifier {
    pub fn new() -> Self {
        let table = StaticTokenVerifier::new()
            .with_token(
                ADMIN_TOKEN,
                VerifiedIdentity::new("admin-1")
                    .with_email("admin@example.com")
                    .with_claim("role", "admin")
                    .with_claim("tenantID", "tenant1"),
            )
            .with_token(
                USER_TOKEN,
                VerifiedIdentity::new("user-1")
                    .with_email("user@example.com")
                    .with_claim("role", "user")
                    .with_claim("tenantID", "tenant1"),
            )
            .with_token(
                NO_ROLE_TOKEN,
                VerifiedIdentity::new("user-2").with_claim("tenantID", "tenant1"),
            )
            .with_token(
                EMPTY_ROLE_TOKEN,
                VerifiedIdentity::new("user-3")
                    .with_claim("role", "")
                    .with_claim("tenantID", "tenant1"),
            )
            .with_token(
                ODD_ROLE_TOKEN,
                VerifiedIdentity::new("user-4")
                    .with_claim("role", "invalid")
                    .with_claim("tenantID", "tenant1"),
            );

        Self {
            table,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IdentityVerifier for CountingVerifier {
    fn backend_name(&self) -> &'static str {
        "counting"
    }

    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, VerifyError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match token {
            SLOW_TOKEN => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(VerifyError::Unavailable("never answered".into()))
            }
            DOWN_TOKEN => Err(VerifyError::Unavailable("connection refused".into())),
            _ => self.table.verify(token).await,
        }
    }
}

pub struct TestApp {
    pub router: Router,
    pub verifier: Arc<CountingVerifier>,
}

pub struct TestAppBuilder {
    cross_check: bool,
    upstream_policy: UpstreamPolicy,
    verify_timeout: Duration,
    request_timeout: Duration,
    policy: RoutePolicy,
}

impl TestAppBuilder {
    pub fn cross_check(mut self, on: bool) -> Self {
        self.cross_check = on;
        self
    }

    pub fn upstream_policy(mut self, policy: UpstreamPolicy) -> Self {
        self.upstream_policy = policy;
        self
    }

    pub fn verify_timeout(mut self, timeout: Duration) -> Self {
        self.verify_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn route_policy(mut self, policy: RoutePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn build(self) -> TestApp {
        let verifier = Arc::new(CountingVerifier::new());
        let pipeline = AuthPipeline::new(
            Authenticator::new(verifier.clone(), self.verify_timeout, self.upstream_policy),
            TenantResolver::new(self.cross_check),
            AccessControl::new(Arc::new(self.policy)),
        );
        let router = build_router(AppState::default(), &pipeline, self.request_timeout);

        TestApp { router, verifier }
    }
}

pub fn app() -> TestAppBuilder {
    TestAppBuilder {
        cross_check: true,
        upstream_policy: UpstreamPolicy::Unauthorized,
        verify_timeout: Duration::from_millis(200),
        request_timeout: Duration::from_secs(30),
        policy: RoutePolicy::default(),
    }
}

pub fn request(path: &str, authorization: Option<&str>, tenant: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(path);
    if let Some(value) = authorization {
        builder = builder.header(AUTHORIZATION, value);
    }
    if let Some(tenant) = tenant {
        builder = builder.header("X-Tenant-ID", tenant);
    }
    builder.body(Body::empty()).expect("request build")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

impl TestApp {
    pub async fn send(&self, req: Request<Body>) -> Response {
        self.router.clone().oneshot(req).await.expect("request execution")
    }

    pub async fn get(&self, path: &str, token: &str, tenant: &str) -> Response {
        self.send(request(path, Some(&bearer(token)), Some(tenant))).await
    }

    pub async fn status(&self, path: &str, token: &str, tenant: &str) -> StatusCode {
        self.get(path, token, tenant).await.status()
    }
}

pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body extraction");
    serde_json::from_slice(&bytes).expect("json deserialization")
}

pub async fn body_text(response: Response) -> String {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body extraction");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}
