use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{Extensions, request::Parts};

use crate::error::AuthError;

use super::{Principal, TenantId};

// Slot types are private to this module: nothing outside can name them, so
// nothing outside can overwrite or remove what the pipeline stored.
#[derive(Clone)]
struct PrincipalSlot(Arc<Principal>);

#[derive(Clone)]
struct TenantSlot(TenantId);

/// Store the principal for this request. A second attach is an ordering fault.
pub fn attach_principal(extensions: &mut Extensions, principal: Principal) -> Result<(), AuthError> {
    if extensions.get::<PrincipalSlot>().is_some() {
        return Err(AuthError::ContextAlreadySet("principal"));
    }
    extensions.insert(PrincipalSlot(Arc::new(principal)));
    Ok(())
}

/// Store the resolved tenant for this request. A second attach is an ordering fault.
pub fn attach_tenant(extensions: &mut Extensions, tenant: TenantId) -> Result<(), AuthError> {
    if extensions.get::<TenantSlot>().is_some() {
        return Err(AuthError::ContextAlreadySet("tenant"));
    }
    extensions.insert(TenantSlot(tenant));
    Ok(())
}

pub fn principal(extensions: &Extensions) -> Option<&Principal> {
    extensions.get::<PrincipalSlot>().map(|slot| slot.0.as_ref())
}

pub fn tenant(extensions: &Extensions) -> Option<&TenantId> {
    extensions.get::<TenantSlot>().map(|slot| &slot.0)
}

/// Handler で、認証済み Principal を受け取るための extractor
/// Authentication stage が request extensions に格納済みである前提
/// 見つからない場合は 401（ミドルウェア未設定）
pub struct CurrentPrincipal(pub Arc<Principal>);

impl<S> FromRequestParts<S> for CurrentPrincipal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<PrincipalSlot>()
            .map(|slot| CurrentPrincipal(Arc::clone(&slot.0)))
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Resolved tenant for handlers. Missing means the Tenancy stage never ran: 500.
pub struct CurrentTenant(pub TenantId);

impl<S> FromRequestParts<S> for CurrentTenant
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        tenant(&parts.extensions)
            .cloned()
            .map(CurrentTenant)
            .ok_or(AuthError::MissingTenantContext)
    }
}
