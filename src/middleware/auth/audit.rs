//! Audit logging for pipeline decisions.
//!
//! Raw credentials never reach the log. Where a credential needs to be
//! correlated, a truncated SHA-256 fingerprint is logged instead.
use axum::http::Extensions;
use sha2::{Digest, Sha256};

use crate::api::extractors::request_ctx::{principal, tenant};
use crate::error::{AuthError, ErrorClass};
use crate::middleware::auth::pipeline::{ChainState, Stage};

const FINGERPRINT_LEN: usize = 12;
const UNKNOWN: &str = "-";

/// Short, non-reversible label for a bearer credential.
pub fn credential_fingerprint(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut fp = hex::encode(digest);
    fp.truncate(FINGERPRINT_LEN);
    fp
}

/// Everything known about a request at the moment it is rejected.
///
/// - `tenant_id`: the resolved tenant, once Tenancy has attached it
/// - `declared_tenant`: the raw `X-Tenant-ID`, known to Tenancy before it resolves
/// - `principal_tenant`: the tenant claim of the authenticated caller
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct Rejection<'a> {
    pub stage: Stage,
    pub path: &'a str,
    pub principal_id: &'a str,
    pub principal_tenant: &'a str,
    pub tenant_id: &'a str,
    pub declared_tenant: &'a str,
    pub state: ChainState,
    pub status: u16,
}

impl<'a> Rejection<'a> {
    pub(crate) fn capture(
        extensions: &'a Extensions,
        stage: Stage,
        path: &'a str,
        declared_tenant: Option<&'a str>,
        err: &AuthError,
    ) -> Self {
        let caller = principal(extensions);
        Self {
            stage,
            path,
            principal_id: caller.map_or(UNKNOWN, |p| p.id.as_str()),
            principal_tenant: caller.map_or(UNKNOWN, |p| p.tenant_id.as_str()),
            tenant_id: tenant(extensions).map_or(UNKNOWN, |t| t.as_str()),
            declared_tenant: declared_tenant.unwrap_or(UNKNOWN),
            state: ChainState::current(extensions),
            status: err.status().as_u16(),
        }
    }
}

pub(crate) fn rejected(
    extensions: &Extensions,
    stage: Stage,
    path: &str,
    declared_tenant: Option<&str>,
    err: &AuthError,
) {
    let r = Rejection::capture(extensions, stage, path, declared_tenant, err);

    // Ordering faults are bugs in the wiring, not caller mistakes.
    if err.class() == ErrorClass::InternalOrdering {
        tracing::error!(
            stage = %r.stage,
            path = r.path,
            principal_id = r.principal_id,
            principal_tenant = r.principal_tenant,
            tenant_id = r.tenant_id,
            declared_tenant = r.declared_tenant,
            state = r.state.as_str(),
            status = r.status,
            reason = %err,
            "request rejected: pipeline ordering fault"
        );
    } else {
        tracing::warn!(
            stage = %r.stage,
            path = r.path,
            principal_id = r.principal_id,
            principal_tenant = r.principal_tenant,
            tenant_id = r.tenant_id,
            declared_tenant = r.declared_tenant,
            state = r.state.as_str(),
            status = r.status,
            reason = %err,
            "request rejected"
        );
    }
}
