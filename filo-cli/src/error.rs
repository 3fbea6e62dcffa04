//! CLI Error Types

use thiserror::Error;

/// CLI-specific errors
#[derive(Error, Debug)]
pub enum CliError {
    /// Catalogue could not be loaded
    #[error("Catalogue error: {0}")]
    Catalogue(#[from] filo_core::CoreError),

    /// Service failed to build or run
    #[error("Tracker error: {0}")]
    Tracker(#[from] filo_tracker::TrackerError),

    /// API server failed
    #[error("Server error: {message}")]
    ServerError { message: String },

    /// API request failed
    #[error("API request failed: {status} - {message}")]
    ApiError { status: u16, message: String },

    /// HTTP client error
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// CLI result type
pub type CliResult<T> = Result<T, CliError>;

impl CliError {
    /// Create a server error
    pub fn server(message: impl Into<String>) -> Self {
        CliError::ServerError {
            message: message.into(),
        }
    }

    /// Get exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Catalogue(_) => 2,
            CliError::Tracker(_) => 3,
            CliError::ServerError { .. } => 4,
            CliError::ApiError { .. } | CliError::HttpError(_) => 5,
            CliError::JsonError(_) => 1,
        }
    }
}
