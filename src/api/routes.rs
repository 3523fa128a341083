/*
 * Responsibility
 * - URL 構造を定義
 * - 未知の path は fallback (JSON 404)。fallback も pipeline の内側にあるので、
 *   404 を見られるのは RBAC を通過した caller だけ
 */
use axum::{Router, routing::get};

use crate::api::handlers::{
    admin::admin_summary,
    companies::search_companies,
    health::{health, root, version},
    not_found::not_found,
    profile::current_user,
};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/version", get(version))
        .route("/user", get(current_user))
        .route("/admin", get(admin_summary))
        .route("/companies/search", get(search_companies))
        .fallback(not_found)
}
