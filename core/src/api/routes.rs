//! API Routes
//!
//! Router configuration for the HTTP API.

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::handlers::{self, ApiState};

/// Create the API router with all routes
pub fn create_router(state: ApiState) -> Router {
    let mut router = Router::new()
        // Health
        .route("/health", get(handlers::health))
        // Notes
        .route("/notes", post(handlers::create_note).get(handlers::list_notes))
        .route("/notes/{key}", delete(handlers::delete_note))
        .route("/notes/commitment", post(handlers::compute_commitment))
        // Merkle
        .route("/merkle/status", get(handlers::merkle_status))
        .route("/merkle/proof", post(handlers::merkle_proof))
        // Root synchronization
        .route("/sync", post(handlers::sync_root))
        .route("/sync/stats", get(handlers::sync_stats));

    if state.dev_mode {
        router = router.route("/dev/deposit", post(handlers::dev_deposit));
    }

    router
        // CORS
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
