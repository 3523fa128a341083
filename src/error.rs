/*
 * Responsibility
 * - AuthError: every way the authorization pipeline can reject a request
 * - AppError: dispatcher/handler level errors
 * - IntoResponse for both (HTTP status + JSON error body)
 *
 * Caller-visible bodies only carry the generic reason for the status.
 * Details (verifier reasons, role/path/tenant values) go to the logs.
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::config::UpstreamPolicy;
use crate::middleware::auth::pipeline::Stage;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

/// Failure taxonomy of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// A required header is missing.
    CallerInput,
    /// The credential is missing, malformed, invalid, or belongs elsewhere.
    Authentication,
    /// Role, path, or tenant policy denial.
    Authorization,
    /// A later stage observed a precondition an earlier stage should have set.
    InternalOrdering,
    /// The identity backend could not answer in time.
    Upstream,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpstreamReason {
    Unavailable,
    Timeout,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing authorization header")]
    MissingCredential,

    #[error("invalid authorization header format")]
    MalformedCredential,

    #[error("credential rejected by identity backend")]
    InvalidCredential,

    #[error("identity backend failure: {reason:?}")]
    Upstream {
        reason: UpstreamReason,
        policy: UpstreamPolicy,
    },

    #[error("tenant id is required")]
    MissingTenant,

    #[error("tenant id mismatch detected during {stage}")]
    TenantMismatch { stage: Stage },

    #[error("no principal in request context")]
    Unauthenticated,

    #[error("tenant context not found")]
    MissingTenantContext,

    #[error("principal has no role")]
    MissingRole,

    #[error("role '{role}' may not access '{path}'")]
    AccessDenied { role: String, path: String },

    #[error("{0} already attached to request context")]
    ContextAlreadySet(&'static str),
}

impl AuthError {
    pub fn class(&self) -> ErrorClass {
        match self {
            AuthError::MissingTenant => ErrorClass::CallerInput,
            AuthError::MissingCredential
            | AuthError::MalformedCredential
            | AuthError::InvalidCredential
            | AuthError::Unauthenticated
            | AuthError::MissingRole => ErrorClass::Authentication,
            // Same condition, different boundary: at Tenancy the credential does not
            // belong to the declared tenant; at Authorization it is a policy denial.
            AuthError::TenantMismatch { stage } => match stage {
                Stage::Authorization => ErrorClass::Authorization,
                Stage::Authentication | Stage::Tenancy => ErrorClass::Authentication,
            },
            AuthError::AccessDenied { .. } => ErrorClass::Authorization,
            AuthError::MissingTenantContext | AuthError::ContextAlreadySet(_) => {
                ErrorClass::InternalOrdering
            }
            AuthError::Upstream { .. } => ErrorClass::Upstream,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.class() {
            ErrorClass::CallerInput => StatusCode::BAD_REQUEST,
            ErrorClass::Authentication => StatusCode::UNAUTHORIZED,
            ErrorClass::Authorization => StatusCode::FORBIDDEN,
            ErrorClass::InternalOrdering => StatusCode::INTERNAL_SERVER_ERROR,
            ErrorClass::Upstream => match self {
                AuthError::Upstream { policy, .. } => policy.status(),
                _ => StatusCode::UNAUTHORIZED,
            },
        }
    }
}

/// Generic code/message pair for a status. Nothing request-specific leaks through here.
fn public_reason(status: StatusCode) -> (&'static str, &'static str) {
    match status {
        StatusCode::BAD_REQUEST => ("BAD_REQUEST", "tenant id is required"),
        StatusCode::UNAUTHORIZED => ("UNAUTHORIZED", "unauthorized"),
        StatusCode::FORBIDDEN => ("FORBIDDEN", "forbidden"),
        StatusCode::GATEWAY_TIMEOUT => ("GATEWAY_TIMEOUT", "identity backend unavailable"),
        _ => ("INTERNAL", "internal server error"),
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let (code, message) = public_reason(status);

        let body = ErrorResponse {
            error: ErrorBody {
                code,
                message: message.to_string(),
            },
        };

        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("not found: {resource}")]
    NotFound { resource: &'static str },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(resource: &'static str) -> Self {
        Self::NotFound { resource }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::NotFound { resource } => (
                StatusCode::NOT_FOUND,
                "NOT_FOUND",
                format!("{resource} not found."),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}
