//! GET /health

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::types::HealthResponse;

/// Health check: returns OK + the provider and active signing algorithm.
pub async fn health(State(state): State<Arc<crate::AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        provider: state.provider.name().into(),
        algorithm: state.config.jwt_session_algorithm.as_str().into(),
    })
}
