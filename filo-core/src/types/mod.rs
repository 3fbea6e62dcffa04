//! Shared domain types

mod common;
mod key;
mod report;
mod status;
mod subscription;
mod target;

pub use common::{format_duration, Coords, DestinationId, MessageHandle};
pub use key::{Instance, InstanceKey};
pub use report::{FateProgress, FateReport, Report};
pub use status::{from_millis, AuthoritativeStatus, HuntStatus, TimerRecord};
pub use subscription::{EventKind, Subscription};
pub use target::{Category, Expansion, Rank, TargetDefinition};
