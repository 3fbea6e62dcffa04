//! Train control endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use filo_core::DestinationId;
use filo_tracker::TrainView;

use crate::dto::{LogKillRequest, StartTrainRequest};
use crate::error::ApiResult;
use crate::state::AppState;

/// Start a train; replaces a train already running on the world
pub async fn start_train(
    State(state): State<AppState>,
    Json(req): Json<StartTrainRequest>,
) -> ApiResult<Json<TrainView>> {
    let view = state
        .service
        .tracker()
        .trains()
        .start_train(
            &req.world,
            req.starting_target.as_deref(),
            req.destination.map(DestinationId),
        )
        .await?;

    Ok(Json(view))
}

/// Current state of the train on a world
pub async fn get_train(
    State(state): State<AppState>,
    Path(world): Path<String>,
) -> ApiResult<Json<TrainView>> {
    let view = state.service.tracker().trains().view(&world).await?;
    Ok(Json(view))
}

/// Cancel the train on a world
pub async fn cancel_train(
    State(state): State<AppState>,
    Path(world): Path<String>,
) -> ApiResult<Json<serde_json::Value>> {
    state.service.tracker().trains().cancel_train(&world).await?;
    Ok(Json(serde_json::json!({ "world": world, "cancelled": true })))
}

/// Log a kill on the train of a world
pub async fn log_kill(
    State(state): State<AppState>,
    Path(world): Path<String>,
    Json(req): Json<LogKillRequest>,
) -> ApiResult<Json<TrainView>> {
    let view = state
        .service
        .tracker()
        .trains()
        .log_kill(&world, &req.target)
        .await?;

    Ok(Json(view))
}
