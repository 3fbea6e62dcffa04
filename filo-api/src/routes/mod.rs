//! API route handlers

pub mod health;
pub mod reports;
pub mod status;
pub mod subscriptions;
pub mod trains;

use axum::{
    routing::{get, post, put},
    Router,
};

use crate::state::AppState;

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health endpoints
        .route("/health", get(health::health_check))
        .route("/ready", get(health::ready_check))
        // Push ingest
        .route("/reports/:source", post(reports::ingest_json))
        .route("/reports/:source/form", post(reports::ingest_form))
        .route("/relay/:source", post(reports::ingest_relay))
        // Status
        .route("/status/:world/:target", get(status::get_status))
        .route("/recheck", post(status::recheck))
        // Subscriptions
        .route(
            "/subscriptions",
            post(subscriptions::subscribe).delete(subscriptions::unsubscribe),
        )
        .route(
            "/subscriptions/:destination",
            get(subscriptions::get_destination).delete(subscriptions::clear_destination),
        )
        .route(
            "/destinations/:destination/notifier",
            put(subscriptions::set_notifier).delete(subscriptions::remove_notifier),
        )
        // Trains
        .route("/trains", post(trains::start_train))
        .route(
            "/trains/:world",
            get(trains::get_train).delete(trains::cancel_train),
        )
        .route("/trains/:world/kills", post(trains::log_kill))
        // State
        .with_state(state)
}
