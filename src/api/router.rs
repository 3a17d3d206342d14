//! Route table and middleware stack.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::StatusCode,
    routing::{get, post},
};
use tower_http::{limit::RequestBodyLimitLayer, timeout::TimeoutLayer, trace::TraceLayer};

use crate::app::AppState;

use super::auth::{index_handler, login_handler, logout_handler, register_handler};
use super::handlers::{health_check_handler, liveness_handler, openapi_handler, webhook_handler};

/// Webhook payloads are small JSON documents
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index_handler))
        .route("/webhook", post(webhook_handler))
        .route("/login", get(login_handler))
        .route("/register", get(register_handler))
        .route("/logout", get(logout_handler))
        .route("/health", get(health_check_handler))
        .route("/health/live", get(liveness_handler))
        .route("/api-docs/openapi.json", get(openapi_handler))
        .with_state(state)
        .layer((
            TraceLayer::new_for_http(),
            RequestBodyLimitLayer::new(MAX_BODY_BYTES),
            // Graceful shutdown waits for in-flight requests; bound how long they can take
            TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, REQUEST_TIMEOUT),
        ))
}
