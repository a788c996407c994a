//! HTTP server facade with Axum, the JSON envelope codec, error handling,
//! and OpenAPI support.

use anyhow::Context;
use axum::{http::StatusCode, routing::get, Router};
use serde::Serialize;

use readinglist_kernel::settings::{Environment, Settings};
use readinglist_kernel::ModuleRegistry;

pub mod envelope;
pub mod error;
pub mod router;

pub use envelope::{decode, encode, DecodeError, Envelope};
pub use error::AppError;
use router::RouterBuilder;

/// Version prefix every module is mounted under.
pub const API_PREFIX: &str = "/v1";

pub const HEALTHCHECK_PATH: &str = "/v1/healthcheck";

/// Service version reported by the healthcheck.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Serve `app` until Ctrl-C or SIGTERM.
pub async fn start_server(app: Router, settings: &Settings) -> anyhow::Result<()> {
    let address = format!("{}:{}", settings.server.host, settings.server.port);
    tracing::info!(env = %settings.environment, "starting HTTP server on {}", address);

    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind to {}", address))?;

    tracing::info!("HTTP server listening on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    tracing::info!("HTTP server stopped");
    Ok(())
}

/// Build the main HTTP router with all module routes mounted
pub fn build_router(registry: &ModuleRegistry, settings: &Settings) -> Router {
    let environment = settings.environment;
    let mut router_builder = RouterBuilder::new().route(
        HEALTHCHECK_PATH,
        get(move || async move { health_check(environment) }),
    );

    for module in registry.modules() {
        let module_name = module.name();
        tracing::info!(
            module = module_name,
            "mounting module routes under {}/{}",
            API_PREFIX,
            module_name
        );
        router_builder = router_builder.mount_module(module_name, module.routes());
    }

    router_builder
        .with_openapi(registry)
        .with_fallbacks()
        .with_body_limit(settings.server.max_body_bytes)
        .with_timeout(settings.server.request_timeout_ms)
        .with_error_envelopes()
        .with_tracing()
        .with_cors()
        .with_request_id()
        .build()
}

#[derive(Debug, Serialize)]
struct HealthReport {
    status: &'static str,
    environment: &'static str,
    version: &'static str,
}

fn health_check(environment: Environment) -> Envelope {
    Envelope::bare(
        StatusCode::OK,
        &HealthReport {
            status: "available",
            environment: environment.as_str(),
            version: VERSION,
        },
    )
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received");
}
