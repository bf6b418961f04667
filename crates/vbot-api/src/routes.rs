//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::limit::RequestBodyLimitLayer;

use crate::error::redact_internal_errors;
use crate::handlers::{delete_file, get_file, get_status, health, submit_download};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Only submissions are rate limited
    let submit_routes = Router::new()
        .route("/download", post(submit_download))
        .layer(middleware::from_fn_with_state(
            state.rate_limiter.clone(),
            rate_limit_middleware,
        ));

    let api_routes = Router::new()
        .merge(submit_routes)
        .route("/status/:job_id", get(get_status))
        .route("/file/:job_id", get(get_file).delete(delete_file));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    let router = Router::new()
        .nest("/api", api_routes)
        .route("/health", get(health))
        .merge(metrics_routes);

    // Redaction runs innermost
    let router = if state.config.is_production() {
        router.layer(middleware::map_response(redact_internal_errors))
    } else {
        router
    };

    let router = router
        .layer(RequestBodyLimitLayer::new(state.config.max_body_size))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging));

    let router = match cors_layer(state.config.cors_origin.as_deref()) {
        Some(cors) => router.layer(cors),
        None => router,
    };

    router.with_state(state)
}
