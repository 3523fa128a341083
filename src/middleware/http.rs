//! Transport layers wrapped around the authorization pipeline.
//!
//! Every request, rejected or not, gets an `x-request-id`, an access log span,
//! a 1 MiB body cap and the request deadline (`REQUEST_TIMEOUT_SECONDS`).
//!
//! The deadline is the request's own cancellation signal. When it expires the
//! inner future is dropped (an in-flight identity verification included) and the
//! caller gets the deployment's upstream-failure status, the same answer the
//! Authentication stage gives for its own verify deadline. 408 is never produced.

use std::time::Duration;

use axum::Router;
use axum::error_handling::HandleErrorLayer;
use axum::http::{Method, Uri, header::HeaderName};
use axum::response::{IntoResponse, Response};
use tower::timeout::{TimeoutLayer, error::Elapsed};
use tower::{BoxError, ServiceBuilder};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::UpstreamPolicy;
use crate::error::{AppError, AuthError, UpstreamReason};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Turn a layer error into a response. Deadline expiry follows `policy`.
fn layer_error(policy: UpstreamPolicy, method: &Method, uri: &Uri, err: &BoxError) -> Response {
    if err.is::<Elapsed>() {
        let err = AuthError::Upstream {
            reason: UpstreamReason::Timeout,
            policy,
        };
        tracing::warn!(
            %method,
            path = uri.path(),
            status = err.status().as_u16(),
            reason = %err,
            "request rejected: request deadline exceeded"
        );
        return err.into_response();
    }

    tracing::error!(%method, path = uri.path(), error = %err, "unhandled middleware error");
    AppError::Internal.into_response()
}

pub fn apply(router: Router, request_timeout: Duration, upstream_policy: UpstreamPolicy) -> Router {
    let request_id_header = HeaderName::from_static(REQUEST_ID_HEADER);

    let layers = ServiceBuilder::new()
        .layer(HandleErrorLayer::new(
            move |method: Method, uri: Uri, err: BoxError| async move {
                layer_error(upstream_policy, &method, &uri, &err)
            },
        ))
        .layer(SetRequestIdLayer::new(
            request_id_header.clone(),
            MakeRequestUuid,
        ))
        .layer(PropagateRequestIdLayer::new(request_id_header))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .layer(TimeoutLayer::new(request_timeout));

    router.layer(layers)
}
