//! Status lookup endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use filo_core::Instance;
use filo_tracker::TargetStatus;

use crate::dto::{RecheckResponse, StatusQuery};
use crate::error::ApiResult;
use crate::state::AppState;

/// Status of one target on one world
pub async fn get_status(
    State(state): State<AppState>,
    Path((world, target)): Path<(String, String)>,
    Query(query): Query<StatusQuery>,
) -> ApiResult<Json<TargetStatus>> {
    let instance = match query.instance {
        Some(n) => Instance::new(n)?,
        None => Instance::FIRST,
    };

    let status = state
        .service
        .tracker()
        .status(&world, &target, instance)
        .await?;

    Ok(Json(status))
}

/// Run a recheck cycle outside of the background schedule
pub async fn recheck(State(state): State<AppState>) -> ApiResult<Json<RecheckResponse>> {
    let summary = state.service.tracker().recheck().await;
    Ok(Json(RecheckResponse { summary }))
}
