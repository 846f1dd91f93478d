use crate::app::AppState;
use crate::handlers::{chat_handler, dependency_health, health_check, not_found};
use axum::{Router, routing::get, routing::post};

/// Creates and configures all application routes
pub fn create_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/health/mcp/github", get(dependency_health))
        .route("/chat", post(chat_handler))
        .fallback(not_found)
}
