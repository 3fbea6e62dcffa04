//! Core error types

use thiserror::Error;

/// Errors raised while parsing identifiers or loading reference data
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Subscription category text did not match any known category
    #[error("Unknown category: {0}")]
    UnknownCategory(String),

    /// Event kind text did not match FINDS, DEATHS or OPENINGS
    #[error("Unknown event kind: {0}")]
    UnknownEventKind(String),

    /// Target id or name is not in the catalogue
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    /// World name or id is not in the world table
    #[error("Unknown world: {0}")]
    UnknownWorld(String),

    /// Datacenter name is not in the world table
    #[error("Unknown datacenter: {0}")]
    UnknownDatacenter(String),

    /// Instance outside of 1..=3
    #[error("Invalid instance: {0} (expected 1-3)")]
    InvalidInstance(i64),

    /// Rank letter is not one of A, S, B, F
    #[error("Invalid rank: {0}")]
    InvalidRank(String),

    /// Catalogue dataset could not be read or parsed
    #[error("Catalogue error: {0}")]
    Catalogue(String),
}

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::Catalogue(e.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(e: std::io::Error) -> Self {
        CoreError::Catalogue(e.to_string())
    }
}
