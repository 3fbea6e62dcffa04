//! Subscription management endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use filo_core::{Category, DestinationId, EventKind};

use crate::dto::{
    DestinationResponse, NotifierRequest, SubscriptionChangeResponse, SubscriptionRequest,
};
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Subscribe a destination to a world or a whole datacenter
pub async fn subscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscriptionRequest>,
) -> ApiResult<Json<SubscriptionChangeResponse>> {
    let (category, kinds) = parse_selection(&req)?;
    let destination = DestinationId(req.destination);
    let router = state.service.tracker().router();

    let changed = match (&req.world, &req.datacenter) {
        (Some(world), None) => router.subscribe(destination, world, category, &kinds).await?,
        (None, Some(datacenter)) => {
            router
                .subscribe_all(destination, datacenter, category, &kinds)
                .await?
        }
        _ => {
            return Err(ApiError::Validation(
                "exactly one of world or datacenter is required".to_string(),
            ))
        }
    };

    Ok(Json(SubscriptionChangeResponse {
        destination: req.destination,
        changed,
    }))
}

/// Remove subscriptions of a destination
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(req): Json<SubscriptionRequest>,
) -> ApiResult<Json<SubscriptionChangeResponse>> {
    let (category, kinds) = parse_selection(&req)?;
    let destination = DestinationId(req.destination);
    let router = state.service.tracker().router();

    let worlds = match (&req.world, &req.datacenter) {
        (Some(world), None) => vec![world.clone()],
        (None, Some(datacenter)) => filo_core::worlds::worlds_in(datacenter)?
            .into_iter()
            .map(str::to_string)
            .collect(),
        _ => {
            return Err(ApiError::Validation(
                "exactly one of world or datacenter is required".to_string(),
            ))
        }
    };

    let mut changed = 0;
    for world in &worlds {
        changed += router.unsubscribe(destination, world, category, &kinds).await?;
    }

    Ok(Json(SubscriptionChangeResponse {
        destination: req.destination,
        changed,
    }))
}

/// Subscriptions and metadata of a destination
pub async fn get_destination(
    State(state): State<AppState>,
    Path(destination): Path<u64>,
) -> ApiResult<Json<DestinationResponse>> {
    let router = state.service.tracker().router();
    let subscriptions = router.get_subscriptions(DestinationId(destination)).await?;
    let meta = router.meta(DestinationId(destination)).await?;

    Ok(Json(DestinationResponse {
        destination,
        subscriptions,
        meta,
    }))
}

/// Drop every subscription of a destination
pub async fn clear_destination(
    State(state): State<AppState>,
    Path(destination): Path<u64>,
) -> ApiResult<Json<SubscriptionChangeResponse>> {
    let changed = state
        .service
        .tracker()
        .router()
        .clear_subscriptions(DestinationId(destination))
        .await?;

    Ok(Json(SubscriptionChangeResponse {
        destination,
        changed,
    }))
}

/// Set the mention prefixed to find notifications
pub async fn set_notifier(
    State(state): State<AppState>,
    Path(destination): Path<u64>,
    Json(req): Json<NotifierRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .service
        .tracker()
        .router()
        .set_notifier(DestinationId(destination), &req.mention)
        .await?;

    Ok(Json(serde_json::json!({
        "destination": destination,
        "notifier": req.mention.trim(),
    })))
}

/// Remove the find mention of a destination
pub async fn remove_notifier(
    State(state): State<AppState>,
    Path(destination): Path<u64>,
) -> ApiResult<Json<serde_json::Value>> {
    state
        .service
        .tracker()
        .router()
        .remove_notifier(DestinationId(destination))
        .await?;

    Ok(Json(serde_json::json!({
        "destination": destination,
        "notifier": null,
    })))
}

fn parse_selection(req: &SubscriptionRequest) -> ApiResult<(Category, Vec<EventKind>)> {
    let category = Category::parse(&req.category)
        .map_err(|e| ApiError::Validation(e.to_string()))?;
    let kinds =
        EventKind::parse_list(&req.events).map_err(|e| ApiError::Validation(e.to_string()))?;
    Ok((category, kinds))
}
