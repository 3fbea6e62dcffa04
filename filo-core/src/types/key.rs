//! Per-target-instance identity

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::MAX_INSTANCES;
use crate::error::{CoreError, CoreResult};

/// Zone instance number (1..=3)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Instance(u8);

impl Instance {
    pub const FIRST: Instance = Instance(1);

    /// Validate an instance number
    ///
    /// `0` is what non-instanced zones report and maps to instance 1.
    pub fn new(value: i64) -> CoreResult<Self> {
        match value {
            0 => Ok(Self::FIRST),
            v if (1..=MAX_INSTANCES as i64).contains(&v) => Ok(Self(v as u8)),
            v => Err(CoreError::InvalidInstance(v)),
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::FIRST
    }
}

impl TryFrom<i64> for Instance {
    type Error = CoreError;

    fn try_from(value: i64) -> CoreResult<Self> {
        Instance::new(value)
    }
}

impl From<Instance> for u8 {
    fn from(instance: Instance) -> u8 {
        instance.0
    }
}

impl fmt::Display for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// `(world, target, instance)` primary key for all per-target state
///
/// Equality and hashing cover the full tuple.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey {
    pub world: String,
    pub target_id: u32,
    pub instance: Instance,
}

impl InstanceKey {
    pub fn new(world: impl Into<String>, target_id: u32, instance: Instance) -> Self {
        Self {
            world: world.into(),
            target_id,
            instance,
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}#{}", self.world, self.target_id, self.instance)
    }
}
