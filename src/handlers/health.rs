use axum::{Json, extract::State};
use serde::Serialize;
use std::sync::Arc;
use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub timestamp: String,
    pub healthy_backends: usize,
    pub tracked_clients: usize,
}

// health handler
pub async fn health_handler(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let healthy_backends = state
        .load_balancer
        .all_backends()
        .iter()
        .filter(|b| b.is_healthy())
        .count();

    Json(HealthResponse {
        status: "healthy",
        timestamp: chrono::Utc::now().to_rfc3339(),
        healthy_backends,
        tracked_clients: state.rate_limiter.tracked(),
    })
}
