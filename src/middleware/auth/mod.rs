/*
 * Responsibility
 * - 認可パイプライン (Authentication → Tenancy → Authorization) の各 stage
 * - pipeline: stage の順序固定と ChainState の記録
 * - audit: reject 時の監査ログ (credential は fingerprint のみ)
 */
pub mod access_control;
mod audit;
pub mod authentication;
pub mod pipeline;
pub mod tenancy;

pub use access_control::AccessControl;
pub use audit::credential_fingerprint;
pub use authentication::{Authenticator, parse_bearer};
pub use pipeline::{AuthPipeline, ChainState, Stage};
pub use tenancy::{TENANT_HEADER, TenantResolver};
