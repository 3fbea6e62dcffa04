//! Logging conventions
//!
//! All crates log through `tracing` with structured fields. Field names
//! are shared here so a world or target reads the same in every module.
//!
//! # Log Levels
//!
//! | Level | Usage | Examples |
//! |-------|-------|----------|
//! | ERROR | Unrecoverable errors | Catalogue failed to load, server crashed |
//! | WARN  | Dropped input, skipped delivery | Malformed report, forbidden destination, region fetch failed |
//! | INFO  | Status changes, deliveries | Target opened, find announced, train finished |
//! | DEBUG | Routine decisions | Cache hit, duplicate report, unknown target id |
//! | TRACE | Full payloads | Raw webhook bodies |
//!
//! # Examples
//!
//! ```ignore
//! use tracing::{info, warn};
//!
//! info!(
//!     world = %key.world,
//!     target = %target.name,
//!     instance = %key.instance,
//!     "Target found"
//! );
//!
//! warn!(source = "xivhunt", error = %e, "Dropping malformed report");
//! ```

use serde::{Deserialize, Serialize};

/// Log level matching the tracing levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }

    /// Parse from string
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "error" => Some(Self::Error),
            "warn" | "warning" => Some(Self::Warn),
            "info" => Some(Self::Info),
            "debug" => Some(Self::Debug),
            "trace" => Some(Self::Trace),
            _ => None,
        }
    }

    /// Build an env-filter directive scoping this level to the filo crates
    ///
    /// Dependencies stay at `warn` so request tracing does not drown the
    /// tracker output.
    pub fn filter_directive(&self) -> String {
        let level = self.as_str();
        format!(
            "warn,filo_core={level},filo_tracker={level},filo_api={level},filo_cli={level},tower_http={level}"
        )
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Standard log field names
pub mod fields {
    pub const WORLD: &str = "world";
    pub const TARGET: &str = "target";
    pub const INSTANCE: &str = "instance";
    pub const REGION: &str = "region";
    pub const DESTINATION: &str = "destination";
    pub const CATEGORY: &str = "category";
    pub const EVENT_KIND: &str = "event_kind";
    pub const SOURCE: &str = "source";
    pub const STATUS: &str = "status";
    pub const ERROR: &str = "error";
    pub const COUNT: &str = "count";
    pub const DURATION_MS: &str = "duration_ms";
}
