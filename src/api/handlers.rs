//! HTTP request handlers with OpenAPI documentation.

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{State, rejection::BytesRejection},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, warn};
use utoipa::OpenApi;

use crate::app::AppState;
use crate::domain::{
    AppError, BankingError, DatabaseError, ErrorDetail, ErrorResponse, HealthResponse,
    HealthStatus,
};

/// OpenAPI documentation structure
#[derive(OpenApi)]
#[openapi(
    info(
        title = "time-is-money",
        version = "0.1.0",
        description = "Monzo webhook receiver that reports payments as hours of disposable income",
        license(
            name = "MIT"
        )
    ),
    paths(
        webhook_handler,
        health_check_handler,
        liveness_handler,
    ),
    components(
        schemas(
            HealthResponse,
            HealthStatus,
            ErrorResponse,
            ErrorDetail,
        )
    ),
    tags(
        (name = "webhooks", description = "Banking provider callbacks"),
        (name = "health", description = "Health check endpoints")
    )
)]
pub struct ApiDoc;

/// Receive a Monzo webhook
///
/// Outgoing `transaction.created` events produce a feed item stating how many
/// hours of disposable income the payment represents. Every other event is
/// acknowledged and ignored.
#[utoipa::path(
    post,
    path = "/webhook",
    tag = "webhooks",
    request_body(content = String, content_type = "application/json", description = "Monzo webhook event"),
    responses(
        (status = 200, description = "Event handled or ignored", body = String),
        (status = 400, description = "Malformed payload", body = ErrorResponse),
        (status = 401, description = "No credentials for the account", body = ErrorResponse),
        (status = 500, description = "Banking API or storage failure", body = ErrorResponse)
    )
)]
pub async fn webhook_handler(
    State(state): State<Arc<AppState>>,
    body: Result<Bytes, BytesRejection>,
) -> Result<&'static str, AppError> {
    let body = body.map_err(|e| {
        warn!(error = %e, "Failed to read webhook body");
        AppError::MalformedPayload(e.body_text())
    })?;
    state.notifications.handle_webhook(&body).await?;
    Ok("OK")
}

/// Detailed health check
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Health status", body = HealthResponse)
    )
)]
pub async fn health_check_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(state.notifications.health_check().await)
}

/// Liveness probe
#[utoipa::path(
    get,
    path = "/health/live",
    tag = "health",
    responses(
        (status = 200, description = "Application is alive")
    )
)]
pub async fn liveness_handler() -> StatusCode {
    StatusCode::OK
}

/// Serve the generated OpenAPI document
pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_type) = match &self {
            AppError::MalformedPayload(_) => (StatusCode::BAD_REQUEST, "malformed_payload"),
            AppError::UnknownAccount(_) => (StatusCode::UNAUTHORIZED, "unknown_account"),
            AppError::Authentication(_) => (StatusCode::UNAUTHORIZED, "authentication_error"),
            AppError::Banking(bank_err) => match bank_err {
                BankingError::AccessTokenExpired => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "access_token_expired")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "banking_api_error"),
            },
            AppError::Database(db_err) => match db_err {
                DatabaseError::Connection(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "database_unavailable")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
            },
            AppError::Config(_) => (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        let message = self.to_string();

        if status.is_server_error() {
            error!(error_type = %error_type, message = %message, "Server error");
        }

        let body = Json(ErrorResponse {
            error: ErrorDetail {
                r#type: error_type.to_string(),
                message,
            },
        });

        (status, body).into_response()
    }
}
