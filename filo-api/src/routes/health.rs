//! Health check endpoints

use axum::{extract::State, Json};
use filo_tracker::ServiceStatus;

use crate::dto::HealthResponse;
use crate::error::ApiResult;
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    Ok(Json(health(&state, "healthy".to_string()).await))
}

/// Ready check endpoint; ready once the background runner polls
pub async fn ready_check(State(state): State<AppState>) -> ApiResult<Json<HealthResponse>> {
    let status = match state.service.status().await {
        ServiceStatus::Running => "ready",
        ServiceStatus::Paused => "paused",
        ServiceStatus::Initializing => "starting",
        ServiceStatus::Stopped => "stopped",
    };

    Ok(Json(health(&state, status.to_string()).await))
}

async fn health(state: &AppState, status: String) -> HealthResponse {
    HealthResponse {
        status,
        version: state.version.clone(),
        service_status: state.service.status().await,
        tracked_worlds: state.service.tracker().tracked_worlds().await.len(),
        catalogue_targets: state.service.catalogue().len(),
    }
}
