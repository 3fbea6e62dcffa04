//! Authoritative timer records and derived status

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

/// Lifecycle phase of a mark
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HuntStatus {
    /// Dead and no respawn possible yet, with no death on record
    Closed,
    /// Inside the respawn window
    Opened,
    /// Past the window end, respawn is forced
    Maxed,
    /// Killed, respawn window not yet open
    Died,
}

impl HuntStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HuntStatus::Closed => "closed",
            HuntStatus::Opened => "open",
            HuntStatus::Maxed => "spawn forced",
            HuntStatus::Died => "dead",
        }
    }
}

impl fmt::Display for HuntStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw per-instance record from the upstream timer service
///
/// Timestamps are Unix milliseconds. Zero, null and unparsable values
/// all deserialize to `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimerRecord {
    #[serde(rename = "Id", default, deserialize_with = "lenient_id")]
    pub id: Option<u32>,
    #[serde(rename = "ins", default, deserialize_with = "lenient_int")]
    pub instance: i64,
    #[serde(default)]
    pub world: String,
    #[serde(rename = "minRespawn", default, deserialize_with = "lenient_millis")]
    pub min_respawn: Option<i64>,
    #[serde(rename = "maxRespawn", default, deserialize_with = "lenient_millis")]
    pub max_respawn: Option<i64>,
    #[serde(rename = "lastDeath", default, deserialize_with = "lenient_millis")]
    pub last_death: Option<i64>,
    #[serde(rename = "openDate", default, deserialize_with = "lenient_millis")]
    pub open_date: Option<i64>,
    #[serde(rename = "maxDate", default, deserialize_with = "lenient_millis")]
    pub max_date: Option<i64>,
    #[serde(rename = "lastAlive", default, deserialize_with = "lenient_millis")]
    pub last_alive: Option<i64>,
    #[serde(rename = "lastTryUnix", default, deserialize_with = "lenient_millis")]
    pub last_try: Option<i64>,
    #[serde(rename = "lastTryUser", default)]
    pub last_try_user: Option<String>,
    #[serde(rename = "lastMark", default, deserialize_with = "lenient_millis")]
    pub last_mark: Option<i64>,
}

/// Status of one instance key as of the last resolution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthoritativeStatus {
    pub status: HuntStatus,
    pub open_at: Option<DateTime<Utc>>,
    pub max_at: Option<DateTime<Utc>>,
    pub last_death_at: Option<DateTime<Utc>>,
    pub last_alive_at: Option<DateTime<Utc>>,
    pub last_mark_at: Option<DateTime<Utc>>,
    pub last_attempt_by: Option<String>,
}

impl AuthoritativeStatus {
    /// A status with no timestamps at all
    pub fn closed() -> Self {
        Self {
            status: HuntStatus::Closed,
            open_at: None,
            max_at: None,
            last_death_at: None,
            last_alive_at: None,
            last_mark_at: None,
            last_attempt_by: None,
        }
    }
}

/// Convert Unix milliseconds to a UTC instant
pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

fn lenient_number(value: Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse::<f64>().ok().map(|f| f as i64),
        _ => None,
    }
}

fn lenient_millis<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(lenient_number).filter(|ms| *ms != 0))
}

fn lenient_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(lenient_number).unwrap_or(0))
}

fn lenient_id<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .and_then(lenient_number)
        .and_then(|id| u32::try_from(id).ok()))
}
