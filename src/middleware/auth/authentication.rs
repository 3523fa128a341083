//! Authentication stage: `Authorization: Bearer <token>` → Principal in the request context.
//!
//! - Header absent → `MissingCredential`; wrong shape or scheme → `MalformedCredential`.
//!   The identity verifier is not called in either case.
//! - Verifier refusal → `InvalidCredential`.
//! - Verifier unreachable, or no answer within `verify_timeout` → `Upstream`, with the
//!   status chosen by the deployment's `UpstreamPolicy`.
//!
//! Cancellation: if the request itself is dropped (client gone, outer timeout), the
//! pending verifier future is dropped with it.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::Next,
    response::Response,
};

use crate::api::extractors::request_ctx::{Principal, attach_principal};
use crate::config::UpstreamPolicy;
use crate::error::{AuthError, UpstreamReason};
use crate::middleware::auth::audit::credential_fingerprint;
use crate::middleware::auth::pipeline::{self, Stage};
use crate::services::identity::{IdentityVerifier, VerifyError};

/// Pull the bearer token out of the `Authorization` header.
///
/// The header is split on the first space; the scheme is compared case-insensitively.
pub fn parse_bearer(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredential)?;

    let raw = value.to_str().map_err(|_| AuthError::MalformedCredential)?;

    let (scheme, token) = raw.split_once(' ').ok_or(AuthError::MalformedCredential)?;
    if !scheme.eq_ignore_ascii_case("bearer") || token.trim().is_empty() {
        return Err(AuthError::MalformedCredential);
    }

    Ok(token)
}

#[derive(Clone)]
pub struct Authenticator {
    verifier: Arc<dyn IdentityVerifier>,
    verify_timeout: Duration,
    upstream_policy: UpstreamPolicy,
}

impl Authenticator {
    pub fn new(
        verifier: Arc<dyn IdentityVerifier>,
        verify_timeout: Duration,
        upstream_policy: UpstreamPolicy,
    ) -> Self {
        Self {
            verifier,
            verify_timeout,
            upstream_policy,
        }
    }

    pub fn upstream_policy(&self) -> UpstreamPolicy {
        self.upstream_policy
    }

    /// Verify `token` and materialize the Principal.
    pub async fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let backend = self.verifier.backend_name();

        let outcome = tokio::time::timeout(self.verify_timeout, self.verifier.verify(token)).await;

        let identity = match outcome {
            Ok(Ok(identity)) => identity,
            Ok(Err(VerifyError::Rejected(reason))) => {
                tracing::warn!(
                    backend,
                    credential_fp = %credential_fingerprint(token),
                    reason = %reason,
                    "credential verification failed"
                );
                return Err(AuthError::InvalidCredential);
            }
            Ok(Err(VerifyError::Unavailable(reason))) => {
                tracing::error!(backend, reason = %reason, "identity backend unavailable");
                return Err(AuthError::Upstream {
                    reason: UpstreamReason::Unavailable,
                    policy: self.upstream_policy,
                });
            }
            Err(_elapsed) => {
                tracing::error!(
                    backend,
                    timeout_ms = self.verify_timeout.as_millis() as u64,
                    "identity backend did not answer in time"
                );
                return Err(AuthError::Upstream {
                    reason: UpstreamReason::Timeout,
                    policy: self.upstream_policy,
                });
            }
        };

        // A backend that "accepts" without saying who the caller is has not verified anything.
        if identity.uid.trim().is_empty() {
            tracing::warn!(
                backend,
                credential_fp = %credential_fingerprint(token),
                "identity backend returned an empty identity"
            );
            return Err(AuthError::InvalidCredential);
        }

        if let Some(expires_at) = identity.expires_at {
            tracing::debug!(uid = %identity.uid, %expires_at, "credential verified");
        }

        Ok(Principal::from_verified(identity))
    }
}

pub async fn authentication_middleware(
    State(auth): State<Authenticator>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AuthError> {
    let path = req.uri().path().to_owned();
    tracing::debug!(stage = %Stage::Authentication, %path, "entering");

    // Own the token so nothing borrows the request across the verifier call.
    let token = match parse_bearer(req.headers()) {
        Ok(token) => token.to_owned(),
        Err(err) => {
            return Err(pipeline::reject(
                req.extensions_mut(),
                Stage::Authentication,
                &path,
                None,
                err,
            ));
        }
    };

    let principal = match auth.authenticate(&token).await {
        Ok(principal) => principal,
        Err(err) => {
            return Err(pipeline::reject(
                req.extensions_mut(),
                Stage::Authentication,
                &path,
                None,
                err,
            ));
        }
    };

    let principal_id = principal.id.clone();
    if let Err(err) = attach_principal(req.extensions_mut(), principal) {
        return Err(pipeline::reject(
            req.extensions_mut(),
            Stage::Authentication,
            &path,
            None,
            err,
        ));
    }
    pipeline::record_pass(req.extensions_mut(), Stage::Authentication);

    tracing::debug!(stage = %Stage::Authentication, %path, %principal_id, "exiting");
    Ok(next.run(req).await)
}
