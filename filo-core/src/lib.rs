//! Filo Core
//!
//! Reference data and pure logic for the hunt tracker:
//!
//! - **Catalogue**: mark and fate definitions, loaded once at startup
//! - **Worlds**: world / datacenter table
//! - **Types**: instance keys, categories, reports, subscriptions
//! - **Resolver**: lifecycle status from authoritative timestamps
//! - **Clock**: time source seam

pub mod catalogue;
pub mod clock;
pub mod constants;
pub mod error;
pub mod logging;
pub mod resolver;
pub mod types;
pub mod worlds;

pub use catalogue::Catalogue;
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{CoreError, CoreResult};
pub use resolver::resolve;
pub use types::*;
pub use worlds::World;
