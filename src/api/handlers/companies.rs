/*
 * Responsibility
 * - GET /companies/search?query=&limit=
 * - limit は省略・不正・0 のとき既定値 (service 側で解決)
 */
use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};

use crate::api::extractors::CurrentTenant;
use crate::error::AppError;
use crate::services::company::{Company, CompanyError};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub query: String,
    pub limit: Option<String>,
}

impl SearchParams {
    fn limit(&self) -> usize {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse().ok())
            .unwrap_or(0)
    }
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub count: usize,
    pub results: Vec<Company>,
    pub next_url: Option<String>,
}

pub async fn search_companies(
    State(state): State<AppState>,
    CurrentTenant(tenant): CurrentTenant,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, AppError> {
    let results = state
        .companies
        .search(&params.query, params.limit())
        .map_err(|err| match err {
            CompanyError::EmptyQuery => AppError::bad_request("INVALID_QUERY", err.to_string()),
        })?;

    tracing::debug!(tenant_id = %tenant, query = %params.query, hits = results.len(), "company search");

    Ok(Json(SearchResponse {
        count: results.len(),
        results,
        next_url: None,
    }))
}
