//! Pipeline assembly: Authentication → Tenancy → Authorization → handler.
//!
//! Each stage is an `axum::middleware::from_fn_with_state` function whose state is
//! the stage's own immutable configuration. A stage either enriches the request
//! context and calls `next`, or returns an `AuthError`, which ends the request:
//! no later stage and no handler runs.
//!
//! ```ignore
//! let pipeline = AuthPipeline::new(authenticator, tenancy, access_control);
//! let app = pipeline.apply(api::routes()).with_state(state);
//! ```
use std::fmt;

use axum::{Router, http::Extensions, middleware};

use crate::config::UpstreamPolicy;
use crate::error::AuthError;
use crate::middleware::auth::access_control::{AccessControl, access_control_middleware};
use crate::middleware::auth::authentication::{Authenticator, authentication_middleware};
use crate::middleware::auth::tenancy::{TenantResolver, tenancy_middleware};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Authentication,
    Tenancy,
    Authorization,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Authentication => "authentication",
            Stage::Tenancy => "tenancy",
            Stage::Authorization => "authorization",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How far a request has progressed through the chain.
///
/// Recorded in the request extensions by each stage on success; the audit log
/// reports it with every rejection. `Rejected` and `Authorized` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChainState {
    #[default]
    Start,
    Authenticated,
    Tenanted,
    Authorized,
    Rejected(Stage),
}

impl ChainState {
    pub fn current(extensions: &Extensions) -> Self {
        extensions.get::<ChainState>().copied().unwrap_or_default()
    }

    /// State after `stage` passed. A stage running out of turn lands in `Rejected`.
    pub fn advance(self, stage: Stage) -> Self {
        match (self, stage) {
            (ChainState::Start, Stage::Authentication) => ChainState::Authenticated,
            // Tenancy may run without a principal (the cross-check is skipped then).
            (ChainState::Start | ChainState::Authenticated, Stage::Tenancy) => ChainState::Tenanted,
            (ChainState::Tenanted, Stage::Authorization) => ChainState::Authorized,
            (ChainState::Rejected(at), _) => ChainState::Rejected(at),
            (_, stage) => ChainState::Rejected(stage),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChainState::Start => "start",
            ChainState::Authenticated => "authenticated",
            ChainState::Tenanted => "tenanted",
            ChainState::Authorized => "authorized",
            ChainState::Rejected(_) => "rejected",
        }
    }
}

/// Record that `stage` passed.
pub(crate) fn record_pass(extensions: &mut Extensions, stage: Stage) -> ChainState {
    let next = ChainState::current(extensions).advance(stage);
    extensions.insert(next);
    next
}

/// The three stages, wired in their one canonical order.
#[derive(Clone)]
pub struct AuthPipeline {
    authenticator: Authenticator,
    tenancy: TenantResolver,
    access_control: AccessControl,
}

impl AuthPipeline {
    pub fn new(authenticator: Authenticator, tenancy: TenantResolver, access_control: AccessControl) -> Self {
        Self {
            authenticator,
            tenancy,
            access_control,
        }
    }

    /// Status answered for identity backend failures, shared with the request deadline.
    pub fn upstream_policy(&self) -> UpstreamPolicy {
        self.authenticator.upstream_policy()
    }

    /// Wrap every route of `router` (fallback included) in the pipeline.
    ///
    /// The last layer added runs first, so the stages are added innermost-first.
    pub fn apply<S>(&self, router: Router<S>) -> Router<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        router
            .layer(middleware::from_fn_with_state(
                self.access_control.clone(),
                access_control_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.tenancy.clone(),
                tenancy_middleware,
            ))
            .layer(middleware::from_fn_with_state(
                self.authenticator.clone(),
                authentication_middleware,
            ))
    }
}

/// Rejection helper shared by the stages: log for audit, mark the chain, hand back the error.
///
/// `declared_tenant` is the raw `X-Tenant-ID` when the rejecting stage has read it
/// but not attached it.
pub(crate) fn reject(
    extensions: &mut Extensions,
    stage: Stage,
    path: &str,
    declared_tenant: Option<&str>,
    err: AuthError,
) -> AuthError {
    super::audit::rejected(extensions, stage, path, declared_tenant, &err);
    extensions.insert(ChainState::Rejected(stage));
    err
}
