//! # gatepass-api: HTTP Service for Gate Passes
//!
//! ## API Surface
//!
//! | Route | Auth | Purpose |
//! |-------|------|---------|
//! | `POST /v1/passes` | bearer | issue a pass from a document image |
//! | `POST /v1/passes/verify` | none | verify scanned QR text |
//! | `GET /health/liveness` | none | process is up |
//! | `GET /health/readiness` | none | ready to serve |
//! | `GET /metrics` | none | Prometheus text counters |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware (issuance only) → Handler
//! ```
//!
//! Handlers delegate to `gatepass-protocol` and never hold business logic.
//! All errors map to structured JSON bodies via [`AppError`].

pub mod auth;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;

pub use error::AppError;
pub use state::{AppConfig, AppState};

/// Assemble the application router.
///
/// Health probes and metrics sit outside every middleware so they stay
/// reachable without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = state.metrics.clone();

    let issuance = routes::passes::issuance_router()
        .layer(from_fn(auth::auth_middleware))
        .layer(axum::Extension(auth_config));

    let api = Router::new()
        .merge(issuance)
        .merge(routes::passes::verification_router())
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(metrics))
        .with_state(state.clone());

    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .route("/metrics", axum::routing::get(middleware::metrics::render))
        .with_state(state);

    Router::new().merge(health).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

/// Ready once the verifier is wired; issuance may still be disabled.
async fn readiness() -> &'static str {
    "ready"
}
