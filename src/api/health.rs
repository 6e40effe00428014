//! Health check endpoint

use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use super::AppState;

/// Simple health response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub open_sessions: usize,
}

/// Liveness check for load balancers
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        open_sessions: state.sessions.session_count().await,
    })
}

/// Create health routes
pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health))
}
