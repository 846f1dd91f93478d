pub mod app;
pub mod config;
pub mod dependency_health;
pub mod error;
pub mod github;
pub mod handlers;
pub mod models;
pub mod query;
pub mod routes;

// Re-export key functions for convenience
pub use app::{AppState, build_router, create_app, init_tracing};
