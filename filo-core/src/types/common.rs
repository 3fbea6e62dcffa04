//! Common types shared across the tracker

use serde::{Deserialize, Serialize};
use std::fmt;

/// Map flag coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coords {
    pub x: f64,
    pub y: f64,
}

impl Coords {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Convert raw world-space position to map flag coordinates
    ///
    /// `offset` is 22.5 for Heavensward zones and 21.5 elsewhere. The
    /// result is rounded to one decimal place like the in-game flag.
    pub fn from_raw(raw_x: f64, raw_y: f64, offset: f64) -> Self {
        let convert = |v: f64| ((v * 0.02 + offset) * 10.0).round() / 10.0;
        Self {
            x: convert(raw_x),
            y: convert(raw_y),
        }
    }
}

impl fmt::Display for Coords {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

/// Notification destination (a chat channel)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationId(pub u64);

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Platform handle of a delivered message, used to edit it later
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageHandle(pub String);

impl MessageHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Render a span of seconds as `"2 hours, 5 minutes, 3 seconds"`
///
/// Hours appear only above 3600 seconds and minutes only above 60, so an
/// exact hour renders as `"60 minutes, 0 seconds"`.
pub fn format_duration(total_seconds: i64) -> String {
    let mut seconds = total_seconds.max(0);
    let mut parts = Vec::with_capacity(3);

    if seconds > 3600 {
        parts.push(format!("{} hours", seconds / 3600));
        seconds %= 3600;
    }
    if seconds > 60 {
        parts.push(format!("{} minutes", seconds / 60));
        seconds %= 60;
    }
    parts.push(format!("{} seconds", seconds));

    parts.join(", ")
}
