use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Creates the main API router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", api_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Search surface routes under /api/v1
fn api_routes() -> Router<AppState> {
    Router::new()
        // Catalog lifecycle
        .route("/status", get(handlers::status))
        .route("/sync", post(handlers::resync))
        // Queries
        .route("/query", post(handlers::submit_query))
        .route("/results", get(handlers::latest_results))
        .route("/search", get(handlers::search))
        // Navigation
        .route("/select", post(handlers::select))
}
