//! Data Transfer Objects for API requests and responses

use filo_core::Subscription;
use filo_tracker::{DestinationMeta, IngestOutcome, RecheckSummary, ServiceStatus};
use serde::{Deserialize, Serialize};

// ============ Health DTOs ============

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub service_status: ServiceStatus,
    pub tracked_worlds: usize,
    pub catalogue_targets: usize,
}

// ============ Ingest DTOs ============

/// Result of a push report
///
/// Push sources get a 200 for every delivery; rejected reports carry
/// `accepted: false` and the reason.
#[derive(Debug, Serialize)]
pub struct IngestResponse {
    pub accepted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<IngestOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    pub fn accepted(outcome: IngestOutcome) -> Self {
        Self {
            accepted: true,
            outcome: Some(outcome),
            error: None,
        }
    }

    pub fn rejected(error: impl Into<String>) -> Self {
        Self {
            accepted: false,
            outcome: None,
            error: Some(error.into()),
        }
    }
}

// ============ Status DTOs ============

/// Status lookup query
#[derive(Debug, Default, Deserialize)]
pub struct StatusQuery {
    /// Zone instance; defaults to 1
    pub instance: Option<i64>,
}

/// Recheck response
#[derive(Debug, Serialize)]
pub struct RecheckResponse {
    #[serde(flatten)]
    pub summary: RecheckSummary,
}

// ============ Subscription DTOs ============

/// Subscribe / unsubscribe request
///
/// Exactly one of `world` or `datacenter` is required; `datacenter`
/// expands to every world of it.
#[derive(Debug, Deserialize)]
pub struct SubscriptionRequest {
    pub destination: u64,
    pub world: Option<String>,
    pub datacenter: Option<String>,
    /// Category, e.g. `SB_A`, `stormblood_s`, `fates`, `trains`
    pub category: String,
    /// Comma separated event kinds (`FINDS, DEATHS, OPENINGS` or `ALL`)
    #[serde(default = "default_events")]
    pub events: String,
}

fn default_events() -> String {
    "ALL".to_string()
}

/// Subscription change response
#[derive(Debug, Serialize)]
pub struct SubscriptionChangeResponse {
    pub destination: u64,
    pub changed: usize,
}

/// Subscriptions of a destination
#[derive(Debug, Serialize)]
pub struct DestinationResponse {
    pub destination: u64,
    pub subscriptions: Vec<Subscription>,
    pub meta: DestinationMeta,
}

/// Set notifier request
#[derive(Debug, Deserialize)]
pub struct NotifierRequest {
    /// Mention prefixed to find notifications, e.g. `<@&1234>`
    pub mention: String,
}

// ============ Train DTOs ============

/// Start train request
#[derive(Debug, Deserialize)]
pub struct StartTrainRequest {
    pub world: String,
    /// First target of the route; the route head when unset
    pub starting_target: Option<String>,
    /// Destination receiving the announcement
    pub destination: Option<u64>,
}

/// Log kill request
#[derive(Debug, Deserialize)]
pub struct LogKillRequest {
    /// Target name or short alias
    pub target: String,
}
