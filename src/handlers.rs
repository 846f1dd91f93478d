use crate::app::AppState;
use crate::dependency_health::{DependencyHealthResponse, check_dependencies};
use crate::error::{AppError, AppResult};
use crate::models::{ChatRequest, ChatResponse, HealthResponse};
use axum::{
    extract::{Json, State, rejection::JsonRejection},
    http::StatusCode,
    response::Json as ResponseJson,
};
use tracing::{debug, info, warn};

pub const MESSAGE_REQUIRED: &str = "Message is required";

/// Health check handler
/// Returns liveness and version information
pub async fn health_check() -> ResponseJson<HealthResponse> {
    debug!("Health check endpoint called");

    let response = HealthResponse::ok();

    info!("Health check successful");
    ResponseJson(response)
}

/// Dependency health handler
/// Exercises the source-control API and the local MCP config file
pub async fn dependency_health(
    State(state): State<AppState>,
) -> (StatusCode, ResponseJson<DependencyHealthResponse>) {
    info!("Dependency health endpoint called");

    let report = check_dependencies(&state.config, &state.github).await;
    let status = if report.is_ok() {
        StatusCode::OK
    } else {
        warn!("Dependency health check failed: {:?}", report.errors);
        StatusCode::INTERNAL_SERVER_ERROR
    };

    (status, ResponseJson(report.into()))
}

/// Chat handler
/// Forwards the message to the AI backend and returns its final answer
pub async fn chat_handler(
    State(state): State<AppState>,
    payload: Result<Json<ChatRequest>, JsonRejection>,
) -> AppResult<ResponseJson<ChatResponse>> {
    // Unparseable bodies are treated like a missing message.
    let payload = match payload {
        Ok(Json(payload)) => payload,
        Err(rejection) => {
            debug!("Rejected chat body: {}", rejection);
            ChatRequest::default()
        }
    };

    let Some(message) = payload.message() else {
        return Err(AppError::BadRequest(MESSAGE_REQUIRED.to_string()));
    };
    info!("Chat endpoint called with {} byte message", message.len());

    let response = state
        .gateway
        .resolve(message, state.config.chat_max_turns)
        .await?;

    info!("Successfully processed chat message, returning response");
    Ok(ResponseJson(ChatResponse::new(response)))
}

/// Fallback for unknown routes
pub async fn not_found() -> AppError {
    AppError::NotFound("Not found".to_string())
}
