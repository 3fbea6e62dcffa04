//! Filo Tracker
//!
//! Hunt and fate tracking engine:
//!
//! - **Timer source**: region-cached authoritative timers
//! - **Ingest**: push report adapters (webhooks, chat relay)
//! - **Tracker**: status diffing, find / progress handling
//! - **Router**: subscriptions and delivery to destinations
//! - **Ledger**: delivered notifications, for edit in place
//! - **Trains**: route sequencing for organised kill trains
//! - **Service**: wiring and the background runner

pub mod config;
pub mod error;
pub mod ingest;
pub mod ledger;
pub mod render;
pub mod router;
pub mod service;
pub mod sink;
pub mod storage;
pub mod timer_source;
pub mod tracker;
pub mod train;

pub use config::{IngestConfig, TrackerConfig};
pub use error::{TrackerError, TrackerResult};
pub use ingest::{AdapterRegistry, FieldMapping, MappedAdapter, NormalizedReport, RawReport, ReportAdapter};
pub use ledger::{NotificationEntry, NotificationLedger};
pub use router::{RoutedEvent, SubscriptionRouter};
pub use service::{BackgroundRunner, FiloService, FiloServiceBuilder, RunnerHandle, ServiceStatus};
pub use sink::{DestinationSink, LogSink, MockSink, Notification, RichPayload, SinkError, WebhookSink};
pub use storage::{DestinationMeta, FileSubscriptionStore, MemorySubscriptionStore, SubscriptionStore};
pub use timer_source::{CachedTimerSource, HttpRegionFetcher, RegionFetcher, StaticRegionFetcher, TimerSource};
pub use tracker::{
    FindOutcome, FoundMarker, HuntTracker, IngestOutcome, ProgressOutcome, RecheckSummary, SweepSummary,
    TargetStatus,
};
pub use train::{Conductor, TrainPhase, TrainRegistry, TrainView};
