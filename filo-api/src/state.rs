//! Application state for the API server

use filo_tracker::FiloService;
use std::sync::Arc;

/// API server state
#[derive(Clone)]
pub struct AppState {
    /// Tracker service
    pub service: Arc<FiloService>,
    /// API version
    pub version: String,
}

impl AppState {
    pub fn new(service: Arc<FiloService>) -> Self {
        Self {
            service,
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub enable_cors: bool,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            enable_cors: true,
        }
    }
}

impl ApiConfig {
    /// Load from `FILO_API_HOST`, `FILO_API_PORT` and `FILO_API_CORS`
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("FILO_API_HOST").unwrap_or(defaults.host),
            port: std::env::var("FILO_API_PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.port),
            enable_cors: std::env::var("FILO_API_CORS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.enable_cors),
        }
    }
}
