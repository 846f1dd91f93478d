use axum::{
    Json,
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use std::any::Any;
use std::sync::Arc;
use tracing::error;

use crate::config::Config;

/// Client-visible message for internal failures outside development mode
pub const GENERIC_ERROR_MESSAGE: &str = "Something went wrong";
const INTERNAL_ERROR: &str = "Internal server error";

/// Custom error type for the application
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(anyhow::Error),
}

/// Body of client errors (4xx)
#[derive(Debug, Serialize)]
pub struct ClientErrorResponse {
    pub error: String,
}

/// Body of internal failures (5xx)
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Detail of an internal failure, carried on the response until
/// [`error_envelope`] turns it into the client-visible body.
#[derive(Debug, Clone)]
pub struct InternalFailure(pub String);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, Json(ClientErrorResponse { error: msg })).into_response()
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, Json(ClientErrorResponse { error: msg })).into_response()
            }
            AppError::Internal(err) => {
                let mut response = StatusCode::INTERNAL_SERVER_ERROR.into_response();
                response
                    .extensions_mut()
                    .insert(InternalFailure(format!("{:#}", err)));
                response
            }
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err)
    }
}

/// Single exit point for internal failures: logs the detail and answers
/// with the uniform 500 envelope. The detail is only shown to clients in
/// development mode.
pub async fn error_envelope(
    State(config): State<Arc<Config>>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let mut response = next.run(request).await;

    let Some(InternalFailure(detail)) = response.extensions_mut().remove::<InternalFailure>()
    else {
        return response;
    };

    error!("Internal server error on {} {}: {}", method, uri, detail);
    let message = if config.development {
        detail
    } else {
        GENERIC_ERROR_MESSAGE.to_string()
    };

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: INTERNAL_ERROR.to_string(),
            message,
        }),
    )
        .into_response()
}

/// Converts a handler panic into an internal failure for [`error_envelope`]
pub fn handle_panic(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "handler panicked".to_string()
    };
    AppError::Internal(anyhow::anyhow!(detail)).into_response()
}

/// Result type for application handlers
pub type AppResult<T> = Result<T, AppError>;
