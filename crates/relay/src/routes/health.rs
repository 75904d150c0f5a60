//! Health check endpoint.

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create health routes.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health))
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}
