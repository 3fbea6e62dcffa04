//! Tracker-wide constants
//!
//! Defaults for the timing windows used by the timer source, the tracker
//! and the background runner. Every value can be overridden through the
//! tracker configuration.

/// Highest instance number a zone can have
pub const MAX_INSTANCES: u8 = 3;

/// Upstream timer cache lifetime (seconds)
pub const TIMER_CACHE_TTL_SECS: u64 = 15;

/// Upstream timer fetch timeout (seconds)
pub const TIMER_FETCH_TIMEOUT_SECS: u64 = 15;

/// Authoritative status recheck interval (seconds)
pub const RECHECK_INTERVAL_SECS: u64 = 7;

/// Fate expiry and ledger sweep interval (seconds)
pub const FATE_SWEEP_INTERVAL_SECS: u64 = 60;

/// Tracked world list refresh interval (seconds)
pub const WORLD_REFRESH_INTERVAL_SECS: u64 = 1800;

/// Per-iteration timeout for periodic tasks (seconds)
pub const TASK_TIMEOUT_SECS: u64 = 30;

/// Window in which a repeated find for a freshly killed target is dropped (seconds)
pub const FIND_GUARD_SECS: i64 = 300;

/// Window in which a same-zone death marks a find as part of a train (seconds)
pub const TRAIN_DEATH_WINDOW_SECS: i64 = 120;

/// Age after which an unconfirmed find marker is considered stale (seconds)
pub const FOUND_STALE_SECS: i64 = 7200;

/// Fate lifetime when the catalogue carries no duration (seconds)
pub const DEFAULT_FATE_DURATION_SECS: u32 = 900;

/// Lower bound for the notification ledger staleness sweep (seconds)
pub const MIN_LEDGER_MAX_AGE_SECS: i64 = 7200;

/// Fate progress value at which a fate is complete
pub const FATE_COMPLETE_PROGRESS: u8 = 100;

/// Worlds rechecked concurrently within one cycle
pub const RECHECK_PARALLELISM: usize = 8;
