/*
 * Responsibility
 * - Types downstream code sees once the pipeline has run
 *   - Principal: who is calling (built once, by the Authentication stage)
 *   - TenantId: which tenant the request is scoped to (the header-declared value)
 *
 * Notes
 * - Optional claims (role, tenant) are defaulted here, exactly once.
 *   Later stages read the typed fields and never look at raw claims again.
 */
use std::fmt;

use serde_json::{Map, Value};

use crate::services::identity::VerifiedIdentity;
use crate::services::route_policy::USER_ROLE;

pub const ROLE_CLAIM: &str = "role";
pub const TENANT_CLAIM: &str = "tenantID";

/// The authenticated caller.
///
/// - `role` is `"user"` when the claim is absent or not a string
/// - `tenant_id` is empty when the claim is absent or not a string
/// - `claims` is the raw claim set, for handlers that need more
#[derive(Debug, Clone, PartialEq)]
pub struct Principal {
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub role: String,
    pub tenant_id: String,
    pub claims: Map<String, Value>,
}

impl Principal {
    pub fn from_verified(identity: VerifiedIdentity) -> Self {
        let role = identity
            .claims
            .get(ROLE_CLAIM)
            .and_then(Value::as_str)
            .unwrap_or(USER_ROLE)
            .to_string();

        let tenant_id = identity
            .claims
            .get(TENANT_CLAIM)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Self {
            id: identity.uid,
            display_name: identity.display_name,
            email: identity.email,
            role,
            tenant_id,
            claims: identity.claims,
        }
    }
}

/// Tenant identifier taken from `X-Tenant-ID`. Opaque; compared byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TenantId(String);

impl TenantId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for TenantId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}
