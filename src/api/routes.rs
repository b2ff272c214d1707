//! API Routes
//!
//! Configures the Axum router with all query service endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    circuit_reset_handler, health_handler, invalidate_handler, query_handler, refresh_handler,
    scope_handler, session_authenticated_handler, session_end_handler, stats_handler, AppState,
};

/// Creates the main router with all endpoints configured.
///
/// # Middleware
/// - CORS: Allows any origin (the browser app calls this directly)
/// - Tracing: Logs all requests for debugging
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query/:entity", get(query_handler))
        .route("/scope", put(scope_handler))
        .route("/refresh", post(refresh_handler))
        .route("/invalidate", post(invalidate_handler))
        .route("/session/end", post(session_end_handler))
        .route("/session/authenticated", post(session_authenticated_handler))
        .route("/circuit/reset", post(circuit_reset_handler))
        .route("/stats", get(stats_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
