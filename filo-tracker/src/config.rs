//! Tracker Configuration
//!
//! Supports loading from environment variables with the `FILO_` prefix.

use chrono::Duration;
use filo_core::constants::{
    FATE_SWEEP_INTERVAL_SECS, FIND_GUARD_SECS, FOUND_STALE_SECS, MIN_LEDGER_MAX_AGE_SECS,
    RECHECK_INTERVAL_SECS, TASK_TIMEOUT_SECS, TIMER_CACHE_TTL_SECS, TIMER_FETCH_TIMEOUT_SECS,
    TRAIN_DEATH_WINDOW_SECS, WORLD_REFRESH_INTERVAL_SECS,
};
use filo_core::logging::LogLevel;
use filo_core::{worlds, Catalogue};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

use crate::ingest::FieldMapping;

/// Default upstream timer endpoint; the region name is appended
pub const DEFAULT_TIMER_ENDPOINT: &str = "https://horus-hunts.net/Timers/GetDcTimers/?DC=";

/// Push source configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// One field mapping per accepted push source
    pub mappings: Vec<FieldMapping>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            mappings: vec![FieldMapping::xivhunt(), FieldMapping::relay()],
        }
    }
}

impl IngestConfig {
    /// Add or replace the mapping for a source
    pub fn with_mapping(mut self, mapping: FieldMapping) -> Self {
        self.mappings.retain(|m| m.source != mapping.source);
        self.mappings.push(mapping);
        self
    }
}

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Timer service base URL
    pub timer_endpoint: String,
    /// Regions (datacenters) polled on the timer service
    pub regions: Vec<String>,
    /// Timer cache lifetime in seconds
    pub timer_ttl_secs: u64,
    /// Timer fetch timeout in seconds
    pub timer_timeout_secs: u64,
    /// Status recheck interval in seconds
    pub recheck_interval_secs: u64,
    /// Fate expiry / ledger sweep interval in seconds
    pub fate_sweep_interval_secs: u64,
    /// Tracked world refresh interval in seconds
    pub world_refresh_interval_secs: u64,
    /// Per-iteration timeout of periodic tasks in seconds
    pub task_timeout_secs: u64,
    /// Duplicate find guard window in seconds
    pub find_guard_secs: i64,
    /// Same-zone death window for the train heuristic in seconds
    pub train_death_window_secs: i64,
    /// Age after which a found marker goes stale in seconds
    pub found_stale_secs: i64,
    /// Ledger entry max age in seconds; derived from the catalogue when unset
    pub ledger_max_age_secs: Option<i64>,
    /// Catalogue dataset; the built-in dataset when unset
    pub catalogue_path: Option<PathBuf>,
    /// Subscription store file; in-memory when unset
    pub subscriptions_path: Option<PathBuf>,
    /// Destination webhook table; deliveries are logged only when unset
    pub webhooks_path: Option<PathBuf>,
    /// Log level
    pub log_level: LogLevel,
    /// Push sources
    pub ingest: IngestConfig,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            timer_endpoint: DEFAULT_TIMER_ENDPOINT.to_string(),
            regions: worlds::datacenters()
                .into_iter()
                .map(str::to_string)
                .collect(),
            timer_ttl_secs: TIMER_CACHE_TTL_SECS,
            timer_timeout_secs: TIMER_FETCH_TIMEOUT_SECS,
            recheck_interval_secs: RECHECK_INTERVAL_SECS,
            fate_sweep_interval_secs: FATE_SWEEP_INTERVAL_SECS,
            world_refresh_interval_secs: WORLD_REFRESH_INTERVAL_SECS,
            task_timeout_secs: TASK_TIMEOUT_SECS,
            find_guard_secs: FIND_GUARD_SECS,
            train_death_window_secs: TRAIN_DEATH_WINDOW_SECS,
            found_stale_secs: FOUND_STALE_SECS,
            ledger_max_age_secs: None,
            catalogue_path: None,
            subscriptions_path: None,
            webhooks_path: None,
            log_level: LogLevel::Info,
            ingest: IngestConfig::default(),
        }
    }
}

impl TrackerConfig {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - FILO_TIMER_ENDPOINT: Timer service base URL
    /// - FILO_REGIONS: Comma separated datacenters to poll
    /// - FILO_TIMER_TTL_SECS: Timer cache lifetime
    /// - FILO_TIMER_TIMEOUT_SECS: Timer fetch timeout
    /// - FILO_RECHECK_INTERVAL_SECS: Status recheck interval
    /// - FILO_FATE_SWEEP_INTERVAL_SECS: Fate expiry sweep interval
    /// - FILO_WORLD_REFRESH_INTERVAL_SECS: World list refresh interval
    /// - FILO_TASK_TIMEOUT_SECS: Periodic task timeout
    /// - FILO_FIND_GUARD_SECS: Duplicate find guard window
    /// - FILO_TRAIN_DEATH_WINDOW_SECS: Train heuristic death window
    /// - FILO_FOUND_STALE_SECS: Found marker lifetime
    /// - FILO_LEDGER_MAX_AGE_SECS: Notification ledger entry lifetime
    /// - FILO_CATALOGUE_PATH: Catalogue dataset (JSON)
    /// - FILO_SUBSCRIPTIONS_PATH: Subscription store file (JSON)
    /// - FILO_WEBHOOKS_PATH: Destination webhook table (JSON)
    /// - FILO_LOG_LEVEL: error/warn/info/debug/trace
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let regions = env::var("FILO_REGIONS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(str::to_string)
                    .collect::<Vec<_>>()
            })
            .filter(|r| !r.is_empty())
            .unwrap_or(defaults.regions);

        Self {
            timer_endpoint: env::var("FILO_TIMER_ENDPOINT").unwrap_or(defaults.timer_endpoint),
            regions,
            timer_ttl_secs: env_or("FILO_TIMER_TTL_SECS", defaults.timer_ttl_secs),
            timer_timeout_secs: env_or("FILO_TIMER_TIMEOUT_SECS", defaults.timer_timeout_secs),
            recheck_interval_secs: env_or(
                "FILO_RECHECK_INTERVAL_SECS",
                defaults.recheck_interval_secs,
            ),
            fate_sweep_interval_secs: env_or(
                "FILO_FATE_SWEEP_INTERVAL_SECS",
                defaults.fate_sweep_interval_secs,
            ),
            world_refresh_interval_secs: env_or(
                "FILO_WORLD_REFRESH_INTERVAL_SECS",
                defaults.world_refresh_interval_secs,
            ),
            task_timeout_secs: env_or("FILO_TASK_TIMEOUT_SECS", defaults.task_timeout_secs),
            find_guard_secs: env_or("FILO_FIND_GUARD_SECS", defaults.find_guard_secs),
            train_death_window_secs: env_or(
                "FILO_TRAIN_DEATH_WINDOW_SECS",
                defaults.train_death_window_secs,
            ),
            found_stale_secs: env_or("FILO_FOUND_STALE_SECS", defaults.found_stale_secs),
            ledger_max_age_secs: env::var("FILO_LEDGER_MAX_AGE_SECS")
                .ok()
                .and_then(|s| s.parse().ok()),
            catalogue_path: env::var("FILO_CATALOGUE_PATH").ok().map(PathBuf::from),
            subscriptions_path: env::var("FILO_SUBSCRIPTIONS_PATH").ok().map(PathBuf::from),
            webhooks_path: env::var("FILO_WEBHOOKS_PATH").ok().map(PathBuf::from),
            log_level: env::var("FILO_LOG_LEVEL")
                .ok()
                .and_then(|s| LogLevel::parse(&s))
                .unwrap_or(defaults.log_level),
            ingest: defaults.ingest,
        }
    }

    /// Development preset: one region, fast intervals, debug logging
    pub fn development() -> Self {
        Self {
            regions: vec!["Crystal".to_string()],
            timer_ttl_secs: 5,
            recheck_interval_secs: 5,
            fate_sweep_interval_secs: 30,
            world_refresh_interval_secs: 300,
            log_level: LogLevel::Debug,
            ..Self::default()
        }
    }

    /// Ledger entry lifetime
    ///
    /// Defaults to the longest spawn window in the catalogue, never below
    /// two hours.
    pub fn ledger_max_age(&self, catalogue: &Catalogue) -> Duration {
        let secs = self.ledger_max_age_secs.unwrap_or_else(|| {
            (catalogue.max_spawn_window_secs() as i64).max(MIN_LEDGER_MAX_AGE_SECS)
        });
        window(secs)
    }

    pub fn find_guard(&self) -> Duration {
        window(self.find_guard_secs)
    }

    pub fn train_death_window(&self) -> Duration {
        window(self.train_death_window_secs)
    }

    pub fn found_stale(&self) -> Duration {
        window(self.found_stale_secs)
    }
}

/// Longest configurable window, roughly a century
pub const MAX_WINDOW_SECS: i64 = 100 * 365 * 24 * 60 * 60;

/// Seconds as a duration, clamped to `0..=MAX_WINDOW_SECS`
///
/// Windows are added to timestamps, so out-of-range values from the
/// environment must not overflow.
pub fn window(secs: i64) -> Duration {
    Duration::seconds(secs.clamp(0, MAX_WINDOW_SECS))
}

fn env_or<T: FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TrackerConfig::default();
        assert_eq!(config.timer_ttl_secs, 15);
        assert_eq!(config.recheck_interval_secs, 7);
        assert_eq!(config.find_guard(), Duration::minutes(5));
        assert_eq!(config.regions.len(), 8);
        assert_eq!(config.ingest.mappings.len(), 2);
    }

    #[test]
    fn test_ledger_max_age_floor() {
        let catalogue = Catalogue::from_json(
            r#"{"marks": {"1": {"Name": "Quick", "Rank": "A", "ZoneName": "Z",
                "RegionName": "R", "Expansion": "SB", "MinSpawn": 60, "MaxSpawn": 600}}}"#,
        )
        .unwrap();

        let config = TrackerConfig::default();
        assert_eq!(config.ledger_max_age(&catalogue), Duration::hours(2));

        let config = TrackerConfig {
            ledger_max_age_secs: Some(60),
            ..TrackerConfig::default()
        };
        assert_eq!(config.ledger_max_age(&catalogue), Duration::seconds(60));
    }

    #[test]
    fn test_oversized_windows_are_clamped() {
        let catalogue = Catalogue::builtin().unwrap();
        let config = TrackerConfig {
            find_guard_secs: i64::MAX,
            train_death_window_secs: -5,
            found_stale_secs: i64::MAX / 2,
            ledger_max_age_secs: Some(i64::MAX),
            ..TrackerConfig::default()
        };

        let ceiling = Duration::seconds(MAX_WINDOW_SECS);
        assert_eq!(config.find_guard(), ceiling);
        assert_eq!(config.train_death_window(), Duration::zero());
        assert_eq!(config.found_stale(), ceiling);
        assert_eq!(config.ledger_max_age(&catalogue), ceiling);

        let now = chrono::Utc::now();
        assert!(now + config.find_guard() > now);
        assert_eq!(window(u64::MAX as i64), Duration::zero());
    }

    #[test]
    fn test_with_mapping_replaces_source() {
        let mut custom = FieldMapping::relay();
        custom.world_id = "server".to_string();
        let ingest = IngestConfig::default().with_mapping(custom);

        assert_eq!(ingest.mappings.len(), 2);
        let relay = ingest.mappings.iter().find(|m| m.source == "relay").unwrap();
        assert_eq!(relay.world_id, "server");
    }
}
