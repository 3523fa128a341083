//! Authorization (RBAC) stage: Principal + Tenant + path → allow / deny.
//!
//! Checks, in order:
//! 1. Principal present (else 401)
//! 2. Tenant context present (else 500, the chain was wired wrong)
//! 3. Role non-empty (else 401)
//! 4. Principal tenant == resolved tenant (else 403)
//! 5. Route policy permits role on path (else 403)
//!
//! Unknown paths are not this stage's concern: a role granted everything passes
//! and the dispatcher answers 404.
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::api::extractors::request_ctx::{Principal, TenantId, principal, tenant};
use crate::error::AuthError;
use crate::middleware::auth::pipeline::{self, Stage};
use crate::services::route_policy::RoutePolicy;

#[derive(Debug, Clone)]
pub struct AccessControl {
    policy: Arc<RoutePolicy>,
}

impl AccessControl {
    pub fn new(policy: Arc<RoutePolicy>) -> Self {
        Self { policy }
    }

    /// Pure decision. Same inputs, same answer.
    pub fn decide(
        &self,
        principal: Option<&Principal>,
        tenant: Option<&TenantId>,
        path: &str,
    ) -> Result<(), AuthError> {
        let principal = principal.ok_or(AuthError::Unauthenticated)?;
        let tenant = tenant.ok_or(AuthError::MissingTenantContext)?;

        if principal.role.is_empty() {
            return Err(AuthError::MissingRole);
        }

        if tenant.as_str() != principal.tenant_id {
            return Err(AuthError::TenantMismatch {
                stage: Stage::Authorization,
            });
        }

        if !self.policy.is_allowed(&principal.role, path) {
            return Err(AuthError::AccessDenied {
                role: principal.role.clone(),
                path: path.to_string(),
            });
        }

        Ok(())
    }
}

pub async fn access_control_middleware(
    State(access): State<AccessControl>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let path = req.uri().path().to_owned();
    tracing::debug!(stage = %Stage::Authorization, %path, "entering");

    let decision = access.decide(principal(req.extensions()), tenant(req.extensions()), &path);
    if let Err(err) = decision {
        return Err(pipeline::reject(req.extensions_mut(), Stage::Authorization, &path, None, err));
    }

    // ここまで来れば principal / tenant は必ず存在する
    let principal_id = principal(req.extensions()).map_or("-", |p| p.id.as_str()).to_owned();
    let role = principal(req.extensions()).map_or("-", |p| p.role.as_str()).to_owned();
    let tenant_id = tenant(req.extensions()).map_or("-", TenantId::as_str).to_owned();

    pipeline::record_pass(req.extensions_mut(), Stage::Authorization);
    tracing::info!(%path, %principal_id, %role, %tenant_id, "access granted");

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;

    use super::*;
    use crate::services::identity::VerifiedIdentity;

    fn access() -> AccessControl {
        AccessControl::new(Arc::new(RoutePolicy::default()))
    }

    fn principal_with(role: Option<&str>, tenant: &str) -> Principal {
        let mut identity = VerifiedIdentity::new("u1").with_claim("tenantID", tenant);
        if let Some(role) = role {
            identity = identity.with_claim("role", role);
        }
        Principal::from_verified(identity)
    }

    fn status_of(result: Result<(), AuthError>) -> StatusCode {
        match result {
            Ok(()) => StatusCode::OK,
            Err(err) => err.status(),
        }
    }

    #[test]
    fn decision_table() {
        let tenant1 = TenantId::new("tenant1");
        let cases = [
            ("admin on admin route", Some("admin"), "tenant1", "/admin", StatusCode::OK),
            ("admin on unknown route", Some("admin"), "tenant1", "/no/such/route", StatusCode::OK),
            ("user on user route", Some("user"), "tenant1", "/user", StatusCode::OK),
            ("user on root", Some("user"), "tenant1", "/", StatusCode::OK),
            ("user on admin route", Some("user"), "tenant1", "/admin", StatusCode::FORBIDDEN),
            ("role claim absent defaults to user", None, "tenant1", "/user", StatusCode::OK),
            ("empty role", Some(""), "tenant1", "/user", StatusCode::UNAUTHORIZED),
            ("unknown role", Some("invalid"), "tenant1", "/user", StatusCode::FORBIDDEN),
            ("cross tenant admin", Some("admin"), "tenant2", "/admin", StatusCode::FORBIDDEN),
        ];

        let access = access();
        for (name, role, claim_tenant, path, expected) in cases {
            let principal = principal_with(role, claim_tenant);
            let got = status_of(access.decide(Some(&principal), Some(&tenant1), path));
            assert_eq!(got, expected, "{name}");
        }
    }

    #[test]
    fn checks_run_in_order() {
        let access = access();
        let tenant = TenantId::new("tenant1");
        let empty_role_elsewhere = principal_with(Some(""), "tenant2");

        assert_eq!(access.decide(None, None, "/"), Err(AuthError::Unauthenticated));
        assert_eq!(
            access.decide(Some(&empty_role_elsewhere), None, "/"),
            Err(AuthError::MissingTenantContext)
        );
        // Empty role is reported before the tenant mismatch.
        assert_eq!(
            access.decide(Some(&empty_role_elsewhere), Some(&tenant), "/"),
            Err(AuthError::MissingRole)
        );
    }

    #[test]
    fn missing_tenant_context_is_an_internal_fault() {
        let principal = principal_with(Some("admin"), "tenant1");
        let err = access().decide(Some(&principal), None, "/admin").unwrap_err();

        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn tenant_mismatch_here_is_forbidden() {
        let principal = principal_with(Some("admin"), "tenant1");
        let err = access()
            .decide(Some(&principal), Some(&TenantId::new("tenant2")), "/admin")
            .unwrap_err();

        assert_eq!(err, AuthError::TenantMismatch { stage: Stage::Authorization });
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn custom_policy_is_honoured() {
        let policy = RoutePolicy::from_json(r#"{ "analyst": ["/reports/*"] }"#).unwrap();
        let access = AccessControl::new(Arc::new(policy));
        let tenant = TenantId::new("tenant1");
        let analyst = principal_with(Some("analyst"), "tenant1");
        let admin = principal_with(Some("admin"), "tenant1");

        assert!(access.decide(Some(&analyst), Some(&tenant), "/reports/q3").is_ok());
        assert!(access.decide(Some(&analyst), Some(&tenant), "/admin").is_err());
        // This policy has no admin grant at all.
        assert!(access.decide(Some(&admin), Some(&tenant), "/admin").is_err());
    }
}
