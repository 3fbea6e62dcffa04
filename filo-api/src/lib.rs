//! Filo API Server
//!
//! REST surface over the hunt tracker: push ingest, status lookup,
//! subscription management and train control.
//!
//! ## Endpoints
//!
//! ### Health
//! - GET /health - Liveness and service status
//! - GET /ready - Ready once the background runner is running
//!
//! ### Push Ingest
//! - POST /reports/:source - JSON report from a webhook source
//! - POST /reports/:source/form - Form-encoded report from a webhook source
//! - POST /relay/:source - Plain-text chat relay message
//!
//! ### Status
//! - GET /status/:world/:target?instance=N - Status of one target
//! - POST /recheck - Run a recheck cycle now
//!
//! ### Subscriptions
//! - POST /subscriptions - Subscribe a destination
//! - DELETE /subscriptions - Unsubscribe a destination
//! - GET /subscriptions/:destination - List subscriptions and metadata
//! - DELETE /subscriptions/:destination - Clear every subscription
//! - PUT /destinations/:destination/notifier - Set the find mention
//! - DELETE /destinations/:destination/notifier - Remove the find mention
//!
//! ### Trains
//! - POST /trains - Start a train
//! - GET /trains/:world - Current train state
//! - DELETE /trains/:world - Cancel a train
//! - POST /trains/:world/kills - Log a kill

pub mod dto;
pub mod error;
pub mod routes;
pub mod server;
pub mod state;

pub use dto::*;
pub use error::*;
pub use routes::*;
pub use server::*;
pub use state::*;
