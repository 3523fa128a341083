use axum::{Json, extract::State};
use serde::Serialize;

use crate::api::extractors::{CurrentPrincipal, CurrentTenant};
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminSummary {
    pub admin_id: String,
    pub tenant_id: String,
    pub company_count: usize,
}

/// Only reachable by roles the route policy grants `/admin`.
pub async fn admin_summary(
    State(state): State<AppState>,
    CurrentPrincipal(principal): CurrentPrincipal,
    CurrentTenant(tenant): CurrentTenant,
) -> Json<AdminSummary> {
    Json(AdminSummary {
        admin_id: principal.id.clone(),
        tenant_id: tenant.to_string(),
        company_count: state.companies.len(),
    })
}
