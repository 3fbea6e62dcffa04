//! Push ingest endpoints
//!
//! Sources are fire-and-forget emitters: every request gets a 200 and a
//! body saying whether the report was accepted.

use axum::{
    extract::{Path, State},
    Form, Json,
};
use filo_tracker::{IngestOutcome, RawReport, TrackerResult};
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::dto::IngestResponse;
use crate::state::AppState;

/// JSON report from a webhook source
pub async fn ingest_json(
    State(state): State<AppState>,
    Path(source): Path<String>,
    body: String,
) -> Json<IngestResponse> {
    let raw = match serde_json::from_str::<RawReport>(&body) {
        Ok(raw) => raw,
        Err(e) => {
            warn!(source = %source, error = %e, "Dropping unreadable report body");
            return Json(IngestResponse::rejected(format!("unreadable report body: {}", e)));
        }
    };

    Json(respond(&source, state.service.ingest(&source, &raw).await))
}

/// Form-encoded report from a webhook source
pub async fn ingest_form(
    State(state): State<AppState>,
    Path(source): Path<String>,
    Form(fields): Form<HashMap<String, String>>,
) -> Json<IngestResponse> {
    let raw: RawReport = fields
        .into_iter()
        .map(|(name, value)| (name, Value::String(value)))
        .collect();

    Json(respond(&source, state.service.ingest(&source, &raw).await))
}

/// Plain-text chat relay message
pub async fn ingest_relay(
    State(state): State<AppState>,
    Path(source): Path<String>,
    body: String,
) -> Json<IngestResponse> {
    Json(respond(&source, state.service.ingest_relay(&source, &body).await))
}

fn respond(source: &str, result: TrackerResult<IngestOutcome>) -> IngestResponse {
    match result {
        Ok(outcome) => {
            debug!(source = %source, outcome = ?outcome, "Report applied");
            IngestResponse::accepted(outcome)
        }
        Err(e) => IngestResponse::rejected(e.to_string()),
    }
}
