/*
 * Responsibility
 * - Dispatcher: 認可パイプラインを通過したリクエストだけがここに来る
 * - routes() の re-export
 */
pub mod extractors;
pub mod handlers;
mod routes;

pub use routes::routes;
