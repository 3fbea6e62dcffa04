//! Filo Service Layer
//!
//! Wires the catalogue, timer source, tracker, router, ledger, trains and
//! push adapters together and owns the background runner.
//!
//! # Example
//!
//! ```rust,ignore
//! use filo_tracker::{FiloService, TrackerConfig};
//!
//! async fn example() {
//!     let service = FiloService::builder()
//!         .config(TrackerConfig::from_env())
//!         .build()
//!         .await?;
//!
//!     service.start().await;
//!     let outcome = service.ingest("xivhunt", &raw).await?;
//! }
//! ```

mod builder;
mod runner;

pub use builder::FiloServiceBuilder;
pub use runner::{BackgroundRunner, RunnerHandle};

use filo_core::Catalogue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, trace, warn};

use crate::config::TrackerConfig;
use crate::error::{TrackerError, TrackerResult};
use crate::ingest::{parse_relay_text, AdapterRegistry, RawReport};
use crate::tracker::{HuntTracker, IngestOutcome};

/// Service status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServiceStatus {
    Initializing,
    Running,
    Paused,
    Stopped,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Initializing => write!(f, "INITIALIZING"),
            Self::Running => write!(f, "RUNNING"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Stopped => write!(f, "STOPPED"),
        }
    }
}

/// Filo service
pub struct FiloService {
    config: TrackerConfig,
    catalogue: Arc<Catalogue>,
    tracker: Arc<HuntTracker>,
    adapters: Arc<AdapterRegistry>,
    status: Arc<RwLock<ServiceStatus>>,
    runner_handle: Arc<RwLock<Option<RunnerHandle>>>,
}

impl FiloService {
    pub fn builder() -> FiloServiceBuilder {
        FiloServiceBuilder::new()
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    pub fn catalogue(&self) -> &Arc<Catalogue> {
        &self.catalogue
    }

    pub fn tracker(&self) -> &Arc<HuntTracker> {
        &self.tracker
    }

    pub fn adapters(&self) -> &Arc<AdapterRegistry> {
        &self.adapters
    }

    pub async fn status(&self) -> ServiceStatus {
        *self.status.read().await
    }

    /// Start the background runner
    pub async fn start(&self) {
        let mut handle = self.runner_handle.write().await;
        if handle.is_some() {
            return;
        }

        for datacenter in &self.config.regions {
            match filo_core::worlds::worlds_in(datacenter) {
                Ok(worlds) => {
                    for world in worlds {
                        self.tracker.track_world(world).await;
                    }
                }
                Err(e) => {
                    warn!(datacenter = %datacenter, error = %e, "Unknown datacenter in regions, skipping");
                }
            }
        }

        let runner = BackgroundRunner::new(self.tracker.clone(), self.config.clone());
        *handle = Some(runner.start().await);
        *self.status.write().await = ServiceStatus::Running;
        info!(regions = ?self.config.regions, "Filo service started");
    }

    /// Stop the background runner
    pub async fn stop(&self) {
        if let Some(handle) = self.runner_handle.write().await.take() {
            handle.stop().await;
        }
        *self.status.write().await = ServiceStatus::Stopped;
        info!("Filo service stopped");
    }

    pub async fn pause(&self) {
        if let Some(handle) = self.runner_handle.read().await.as_ref() {
            handle.pause().await;
            *self.status.write().await = ServiceStatus::Paused;
        }
    }

    pub async fn resume(&self) {
        if let Some(handle) = self.runner_handle.read().await.as_ref() {
            handle.resume().await;
            *self.status.write().await = ServiceStatus::Running;
        }
    }

    /// Normalize and apply a key/value report from a push source
    ///
    /// Malformed payloads are logged and returned as `MalformedReport`.
    pub async fn ingest(&self, source: &str, raw: &RawReport) -> TrackerResult<IngestOutcome> {
        trace!(source = %source, payload = ?raw, "Push report");
        let report = match self.adapters.normalize(source, raw) {
            Ok(report) => report,
            Err(e @ TrackerError::MalformedReport(_)) => {
                warn!(source = %source, error = %e, "Dropping malformed report");
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        self.tracker.handle_report(report).await
    }

    /// Parse and apply a chat-relay message
    pub async fn ingest_relay(&self, source: &str, text: &str) -> TrackerResult<IngestOutcome> {
        let raw = parse_relay_text(text).map_err(|e| {
            warn!(source = %source, error = %e, "Dropping malformed relay message");
            e
        })?;
        self.ingest(source, &raw).await
    }
}
