/*!
 * Request context
 *
 * Responsibility:
 * - パイプラインが確定した Principal / TenantId を request extensions に保持する
 * - 型付きアクセサのみを公開（文字列キーでの参照はしない）
 * - HTTP / axum 依存は core に閉じ込め、型定義は types に分離する
 *
 * Public API:
 * - Principal, TenantId
 * - attach_principal, attach_tenant, principal, tenant
 * - CurrentPrincipal, CurrentTenant
 */

mod core;
mod types;

pub use self::core::{CurrentPrincipal, CurrentTenant, attach_principal, attach_tenant, principal, tenant};
pub use self::types::{Principal, ROLE_CLAIM, TENANT_CLAIM, TenantId};
