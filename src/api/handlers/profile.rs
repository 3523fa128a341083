/*
 * Responsibility
 * - GET /user: 呼び出し元の Principal / Tenant をそのまま返す
 * - raw claims は返さない (id / role / tenant / email / name のみ)
 */
use axum::Json;
use serde::Serialize;

use crate::api::extractors::{CurrentPrincipal, CurrentTenant};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileResponse {
    pub id: String,
    pub role: String,
    pub tenant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

pub async fn current_user(
    CurrentPrincipal(principal): CurrentPrincipal,
    CurrentTenant(tenant): CurrentTenant,
) -> Json<ProfileResponse> {
    Json(ProfileResponse {
        id: principal.id.clone(),
        role: principal.role.clone(),
        tenant_id: tenant.to_string(),
        email: principal.email.clone(),
        display_name: principal.display_name.clone(),
    })
}
