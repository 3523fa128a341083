//! Tenancy stage: `X-Tenant-ID` → TenantId in the request context.
//!
//! The stored value is always the header value as sent. With `cross_check` on and a
//! Principal already attached, the header must equal the Principal's tenant claim.
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, Request},
    middleware::Next,
    response::Response,
};

use crate::api::extractors::request_ctx::{Principal, TenantId, attach_tenant, principal};
use crate::error::AuthError;
use crate::middleware::auth::pipeline::{self, Stage};

pub const TENANT_HEADER: HeaderName = HeaderName::from_static("x-tenant-id");

/// The `X-Tenant-ID` value as sent, if it is readable text.
fn declared_tenant(headers: &HeaderMap) -> Option<&str> {
    headers.get(&TENANT_HEADER).and_then(|v| v.to_str().ok())
}

#[derive(Debug, Clone, Copy)]
pub struct TenantResolver {
    cross_check: bool,
}

impl TenantResolver {
    pub fn new(cross_check: bool) -> Self {
        Self { cross_check }
    }

    pub fn resolve(&self, headers: &HeaderMap, principal: Option<&Principal>) -> Result<TenantId, AuthError> {
        let declared = declared_tenant(headers)
            .filter(|v| !v.trim().is_empty())
            .ok_or(AuthError::MissingTenant)?;

        if let Some(principal) = principal.filter(|_| self.cross_check) {
            if principal.tenant_id != declared {
                return Err(AuthError::TenantMismatch {
                    stage: Stage::Tenancy,
                });
            }
        }

        Ok(TenantId::new(declared))
    }
}

pub async fn tenancy_middleware(
    State(resolver): State<TenantResolver>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let path = req.uri().path().to_owned();
    tracing::debug!(stage = %Stage::Tenancy, %path, "entering");

    let tenant = match resolver.resolve(req.headers(), principal(req.extensions())) {
        Ok(tenant) => tenant,
        Err(err) => {
            // Kept for the audit line: a refused tenant is never attached.
            let declared = declared_tenant(req.headers()).map(str::to_owned);
            return Err(pipeline::reject(
                req.extensions_mut(),
                Stage::Tenancy,
                &path,
                declared.as_deref(),
                err,
            ));
        }
    };
    if let Err(err) = attach_tenant(req.extensions_mut(), tenant.clone()) {
        return Err(pipeline::reject(
            req.extensions_mut(),
            Stage::Tenancy,
            &path,
            Some(tenant.as_str()),
            err,
        ));
    }
    pipeline::record_pass(req.extensions_mut(), Stage::Tenancy);

    tracing::debug!(stage = %Stage::Tenancy, %path, tenant_id = %tenant, "exiting");
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;
    use crate::services::identity::VerifiedIdentity;

    fn headers(tenant: Option<&'static str>) -> HeaderMap {
        let mut headers = HeaderMap::new();
        if let Some(tenant) = tenant {
            headers.insert(TENANT_HEADER, HeaderValue::from_static(tenant));
        }
        headers
    }

    fn principal_in(tenant: &str) -> Principal {
        Principal::from_verified(VerifiedIdentity::new("u1").with_claim("tenantID", tenant))
    }

    #[test]
    fn missing_or_blank_header_is_caller_error() {
        let resolver = TenantResolver::new(true);

        for h in [headers(None), headers(Some("")), headers(Some("   "))] {
            assert_eq!(resolver.resolve(&h, None), Err(AuthError::MissingTenant));
        }
    }

    #[test]
    fn non_utf8_header_is_treated_as_missing() {
        let mut h = HeaderMap::new();
        h.insert(TENANT_HEADER, HeaderValue::from_bytes(b"t\xffx").unwrap());

        assert_eq!(TenantResolver::new(false).resolve(&h, None), Err(AuthError::MissingTenant));
    }

    #[test]
    fn header_value_is_stored_as_sent() {
        let resolver = TenantResolver::new(true);
        let tenant = resolver
            .resolve(&headers(Some("tenant1")), Some(&principal_in("tenant1")))
            .unwrap();

        assert_eq!(tenant.as_str(), "tenant1");
    }

    #[test]
    fn cross_check_rejects_foreign_tenant() {
        let resolver = TenantResolver::new(true);
        let err = resolver
            .resolve(&headers(Some("tenant2")), Some(&principal_in("tenant1")))
            .unwrap_err();

        assert_eq!(err, AuthError::TenantMismatch { stage: Stage::Tenancy });
        assert_eq!(err.status(), axum::http::StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn cross_check_is_byte_exact() {
        let resolver = TenantResolver::new(true);
        assert!(
            resolver
                .resolve(&headers(Some("Tenant1")), Some(&principal_in("tenant1")))
                .is_err()
        );
    }

    #[test]
    fn without_cross_check_mismatch_passes_through() {
        let resolver = TenantResolver::new(false);
        let tenant = resolver
            .resolve(&headers(Some("tenant2")), Some(&principal_in("tenant1")))
            .unwrap();

        // The header wins; Authorization sees the mismatch later.
        assert_eq!(tenant.as_str(), "tenant2");
    }

    #[test]
    fn no_principal_skips_cross_check() {
        let resolver = TenantResolver::new(true);
        assert!(resolver.resolve(&headers(Some("tenant9")), None).is_ok());
    }
}
