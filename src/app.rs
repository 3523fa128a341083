/*
 * Responsibility
 * - Config読み込み → 依存生成 (identity verifier / route policy / state) → Router 組み立て
 * - 認可パイプライン + HTTP middleware の適用
 * - axum::serve() で起動、SIGINT/SIGTERM で graceful shutdown
 */
use std::{panic, process, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::config::Config;
use crate::middleware::{
    self,
    auth::{AccessControl, AuthPipeline, Authenticator, TenantResolver},
};
use crate::services::identity::{IdentityVerifier, build_identity_verifier};
use crate::services::route_policy::RoutePolicy;
use crate::state::AppState;

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,tenant_gate=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched.
        tracing::error!(?info, "panic");

        // Development: crash the whole process so we notice immediately.
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env().context("failed to load configuration")?;

    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        "starting API in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let verifier = build_identity_verifier(&config.identity).context("failed to build identity verifier")?;
    let pipeline = build_pipeline(&config, verifier)?;
    let state = AppState::default();
    let app = build_router(state, &pipeline, config.request_timeout);

    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("failed to bind {}", config.addr))?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

/// Assemble the three stages from configuration. The route policy is loaded once here.
pub fn build_pipeline(config: &Config, verifier: Arc<dyn IdentityVerifier>) -> Result<AuthPipeline> {
    let policy = match &config.route_policy_path {
        Some(path) => RoutePolicy::from_file(path)
            .with_context(|| format!("failed to load route policy from {}", path.display()))?,
        None => RoutePolicy::default(),
    };

    let mut roles: Vec<&str> = policy.roles().collect();
    roles.sort_unstable();
    tracing::info!(
        ?roles,
        tenant_cross_check = config.tenant_cross_check,
        upstream_failure_status = config.upstream_policy.status().as_u16(),
        "authorization pipeline configured"
    );

    Ok(AuthPipeline::new(
        Authenticator::new(verifier, config.identity.verify_timeout, config.upstream_policy),
        TenantResolver::new(config.tenant_cross_check),
        AccessControl::new(Arc::new(policy)),
    ))
}

/// Dispatcher routes behind the pipeline, HTTP layers outside it.
pub fn build_router(state: AppState, pipeline: &AuthPipeline, request_timeout: Duration) -> Router {
    let router = pipeline.apply(api::routes()).with_state(state);
    middleware::http::apply(router, request_timeout, pipeline.upstream_policy())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {}", e);
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received Ctrl+C, draining in-flight requests"),
        () = terminate => tracing::info!("received SIGTERM, draining in-flight requests"),
    }
}
