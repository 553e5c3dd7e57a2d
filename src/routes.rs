use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware::from_fn_with_state,
    routing::get,
};
use std::sync::Arc;
use tower_http::limit::RequestBodyLimitLayer;

use crate::admission::rate_limit;
use crate::handlers::{forward_handler, health_handler, metrics_handler};
use crate::state::AppState;

// Gateway routes: own endpoints, everything else relayed upstream.
// The rate limit layer wraps the fallback too and skips /health and /metrics itself.
// Bodies over max_body_bytes get 413: declared lengths from RequestBodyLimitLayer,
// streamed ones when the Bytes extractor hits the limit.
pub fn router(state: Arc<AppState>) -> Router {
    let max_body_bytes = state.max_body_bytes;
    Router::new()
        .route("/health", get(health_handler))
        .route("/metrics", get(metrics_handler))
        .fallback(forward_handler)
        .layer(from_fn_with_state(state.clone(), rate_limit))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .with_state(state)
}
