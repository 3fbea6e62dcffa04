//! Canonical push report shapes

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::common::Coords;
use super::key::{Instance, InstanceKey};
use super::target::Rank;

/// One normalized sighting of a mark
///
/// Reports are folded into tracker state and then discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub world: String,
    pub target_id: u32,
    pub instance: Instance,
    pub alive: bool,
    pub coords: Option<Coords>,
    pub observed_at: DateTime<Utc>,
    pub rank_hint: Option<Rank>,
    /// Name of the push source that produced the report
    pub source: String,
}

impl Report {
    pub fn key(&self) -> InstanceKey {
        InstanceKey::new(self.world.clone(), self.target_id, self.instance)
    }
}

/// Progress snapshot of a running fate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FateProgress {
    /// Completion percentage, 0-100
    pub progress: u8,
    pub time_remaining_secs: Option<u32>,
    pub coords: Option<Coords>,
    pub observed_at: DateTime<Utc>,
}

impl FateProgress {
    pub fn is_complete(&self) -> bool {
        self.progress >= crate::constants::FATE_COMPLETE_PROGRESS
    }
}

/// A normalized fate report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FateReport {
    pub world: String,
    pub fate_id: u32,
    pub instance: Instance,
    /// `None` when the source reports the fate as gone
    pub progress: Option<FateProgress>,
    pub source: String,
}
