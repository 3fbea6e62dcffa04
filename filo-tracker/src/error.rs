//! Tracker Error Types
//!
//! Every variant is absorbed at the boundary where it occurs: a failed
//! region, a bad report or an unreachable destination never aborts a
//! recheck cycle or a periodic task.

use filo_core::{CoreError, DestinationId};
use thiserror::Error;

/// Tracker error
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Timer service fetch for a region failed; stale data is kept
    #[error("Upstream unavailable for {region}: {message}")]
    UpstreamUnavailable { region: String, message: String },

    /// Report or lookup references a target missing from the catalogue
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    /// Destination is permanently gone
    #[error("Destination {0} unreachable")]
    DestinationUnreachable(DestinationId),

    /// Destination temporarily rejects deliveries
    #[error("Destination {0} forbidden")]
    DestinationForbidden(DestinationId),

    /// Report for a key already found or killed within the guard window
    #[error("Duplicate report: {0}")]
    DuplicateReport(String),

    /// Report payload could not be normalized
    #[error("Malformed report: {0}")]
    MalformedReport(String),

    /// Requested world or target state does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Reference data error
    #[error("Core error: {0}")]
    Core(#[from] CoreError),

    /// Subscription persistence error
    #[error("Storage error: {0}")]
    Storage(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network error
    #[error("Network error: {0}")]
    Network(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Tracker Result type
pub type TrackerResult<T> = Result<T, TrackerError>;

impl From<reqwest::Error> for TrackerError {
    fn from(e: reqwest::Error) -> Self {
        TrackerError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(e: serde_json::Error) -> Self {
        TrackerError::Serialization(e.to_string())
    }
}

impl From<std::io::Error> for TrackerError {
    fn from(e: std::io::Error) -> Self {
        TrackerError::Storage(e.to_string())
    }
}

impl TrackerError {
    /// Whether the caller should answer with a "not found"
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            TrackerError::NotFound(_)
                | TrackerError::UnknownTarget(_)
                | TrackerError::Core(CoreError::UnknownTarget(_))
                | TrackerError::Core(CoreError::UnknownWorld(_))
                | TrackerError::Core(CoreError::UnknownDatacenter(_))
        )
    }
}
