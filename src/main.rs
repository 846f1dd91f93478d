use alexbot::app::{create_app, init_tracing};
use alexbot::config::Config;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    // Loaded first so RUST_LOG from .env reaches the subscriber
    let dotenv = dotenvy::dotenv();

    // Initialize tracing/logging
    init_tracing();

    info!("Starting alexbot...");
    if let Err(e) = dotenv {
        info!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {:#}", e);
            std::process::exit(1);
        }
    };
    info!("Configuration loaded: {:?}", config);
    if config.anthropic_api_key.is_none() {
        warn!("ANTHROPIC_API_KEY not set, chat requests rely on the CLI's own credentials");
    }

    let bind_address = config.bind_address();
    let server_url = config.server_url();

    // Create the application
    let app = create_app(config);

    // Create TCP listener
    let listener = match tokio::net::TcpListener::bind(&bind_address).await {
        Ok(listener) => {
            info!("Server running on {}", server_url);
            info!("Health check: GET /health");
            info!("Dependency check: GET /health/mcp/github");
            info!("Chat endpoint: POST /chat");
            listener
        }
        Err(e) => {
            error!("Failed to bind to {}: {}", bind_address, e);
            std::process::exit(1);
        }
    };

    // Start the server
    info!("Server starting...");
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {}", e);
    } else {
        info!("Server shutdown gracefully");
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
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
    info!("Shutdown signal received");
}
