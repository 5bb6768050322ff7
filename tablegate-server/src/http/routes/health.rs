//! Health check endpoint

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};

use crate::http::server::AppState;
use crate::models::HealthReport;

/// GET /health - database connectivity probe; always 200
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(state.db.health_check().await)
}

/// Health routes
pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(health))
}
