use axum::{Router, middleware};
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::error::{error_envelope, handle_panic};
use crate::github::GitHubClient;
use crate::query::{ClaudeCli, QueryBackend, QueryGateway};
use crate::routes::create_routes;

/// Initialize tracing and logging for the application
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "alexbot=info,tower_http=debug,axum::rejection=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Shared, read-only state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: QueryGateway,
    pub github: GitHubClient,
}

impl AppState {
    pub fn new(config: Config, backend: Arc<dyn QueryBackend>) -> Self {
        let github = GitHubClient::new(config.github_api_url.clone());
        Self {
            config: Arc::new(config),
            gateway: QueryGateway::new(backend),
            github,
        }
    }

    /// State backed by the agent CLI configured in `config`
    pub fn from_config(config: Config) -> Self {
        let backend = ClaudeCli::new(config.claude_path.clone(), config.anthropic_api_key.clone());
        Self::new(config, Arc::new(backend))
    }
}

/// Builds the router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(create_routes())
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(
            state.config.clone(),
            error_envelope,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Create and configure the Axum application from configuration
pub fn create_app(config: Config) -> Router {
    info!("Initializing application router");
    build_router(AppState::from_config(config))
}
