//! Authoritative Timer Source
//!
//! Polls the upstream timer service once per region and keeps one cache
//! per region. A region is fetched at most once per TTL; a failed fetch
//! leaves that region's previous snapshot in place.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use filo_core::{resolve, AuthoritativeStatus, Catalogue, Clock, Instance, InstanceKey, TimerRecord};
use futures::future::join_all;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::window;
use crate::error::{TrackerError, TrackerResult};

/// Timers of one world, keyed by upstream timer key (`"6002_1"`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldTimers {
    #[serde(default)]
    pub timers: HashMap<String, TimerRecord>,
}

/// One region's upstream response, keyed by world name
pub type RegionSnapshot = HashMap<String, WorldTimers>;

/// Fetches a region snapshot from the timer service
#[async_trait]
pub trait RegionFetcher: Send + Sync {
    async fn fetch(&self, region: &str) -> TrackerResult<RegionSnapshot>;
}

/// HTTP fetcher: `GET {endpoint}{region}`
pub struct HttpRegionFetcher {
    client: Client,
    endpoint: String,
}

impl HttpRegionFetcher {
    pub fn new(endpoint: impl Into<String>, timeout_secs: u64) -> TrackerResult<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TrackerError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl RegionFetcher for HttpRegionFetcher {
    async fn fetch(&self, region: &str) -> TrackerResult<RegionSnapshot> {
        let url = format!("{}{}", self.endpoint, region);
        debug!(region = %region, url = %url, "Querying timer service");

        let unavailable = |message: String| TrackerError::UpstreamUnavailable {
            region: region.to_string(),
            message,
        };

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| unavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(unavailable(format!("HTTP {}", status)));
        }

        response
            .json::<RegionSnapshot>()
            .await
            .map_err(|e| unavailable(e.to_string()))
    }
}

/// In-memory fetcher for tests and offline runs
#[derive(Default)]
pub struct StaticRegionFetcher {
    regions: RwLock<HashMap<String, RegionSnapshot>>,
    failing: RwLock<BTreeSet<String>>,
    calls: AtomicUsize,
}

impl StaticRegionFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one timer record of a world in a region
    pub async fn set_timer(&self, region: &str, world: &str, timer_key: &str, record: TimerRecord) {
        let mut regions = self.regions.write().await;
        regions
            .entry(region.to_string())
            .or_default()
            .entry(world.to_string())
            .or_default()
            .timers
            .insert(timer_key.to_string(), record);
    }

    /// Drop one timer record; the world stays in the snapshot
    pub async fn remove_timer(&self, region: &str, world: &str, timer_key: &str) {
        if let Some(timers) = self
            .regions
            .write()
            .await
            .get_mut(region)
            .and_then(|worlds| worlds.get_mut(world))
        {
            timers.timers.remove(timer_key);
        }
    }

    /// Make fetches of a region fail (or succeed again)
    pub async fn set_failing(&self, region: &str, failing: bool) {
        let mut set = self.failing.write().await;
        if failing {
            set.insert(region.to_string());
        } else {
            set.remove(region);
        }
    }

    /// Number of fetches performed
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RegionFetcher for StaticRegionFetcher {
    async fn fetch(&self, region: &str) -> TrackerResult<RegionSnapshot> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.read().await.contains(region) {
            return Err(TrackerError::UpstreamUnavailable {
                region: region.to_string(),
                message: "simulated outage".to_string(),
            });
        }
        Ok(self.regions.read().await.get(region).cloned().unwrap_or_default())
    }
}

/// Source of authoritative per-instance status
#[async_trait]
pub trait TimerSource: Send + Sync {
    /// Refresh stale region caches
    async fn refresh(&self);

    /// Current status of every known instance key of a world
    ///
    /// `NotFound` when the world is absent from every fetched snapshot,
    /// `UpstreamUnavailable` when no region was ever fetched.
    async fn load(&self, world: &str) -> TrackerResult<HashMap<InstanceKey, AuthoritativeStatus>>;

    /// Worlds present in the cached snapshots
    async fn worlds(&self) -> Vec<String>;
}

#[derive(Debug, Default)]
struct RegionCache {
    attempted_at: Option<DateTime<Utc>>,
    /// Last successful fetch
    fetched_at: Option<DateTime<Utc>>,
    snapshot: RegionSnapshot,
}

/// Region-cached timer source
pub struct CachedTimerSource {
    fetcher: Arc<dyn RegionFetcher>,
    catalogue: Arc<Catalogue>,
    clock: Arc<dyn Clock>,
    regions: Vec<String>,
    ttl: Duration,
    cache: RwLock<HashMap<String, RegionCache>>,
    refresh_lock: Mutex<()>,
}

impl CachedTimerSource {
    pub fn new(
        fetcher: Arc<dyn RegionFetcher>,
        catalogue: Arc<Catalogue>,
        clock: Arc<dyn Clock>,
        regions: Vec<String>,
        ttl_secs: u64,
    ) -> Self {
        Self {
            fetcher,
            catalogue,
            clock,
            regions,
            ttl: window(i64::try_from(ttl_secs).unwrap_or(i64::MAX)),
            cache: RwLock::new(HashMap::new()),
            refresh_lock: Mutex::new(()),
        }
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    /// Regions whose cache is older than the TTL
    async fn stale_regions(&self, now: DateTime<Utc>) -> Vec<String> {
        let cache = self.cache.read().await;
        self.regions
            .iter()
            .filter(|region| {
                match cache.get(*region).and_then(|c| c.attempted_at) {
                    Some(at) if now < at + self.ttl => {
                        debug!(region = %region, "Timer cache still fresh");
                        false
                    }
                    _ => true,
                }
            })
            .cloned()
            .collect()
    }

    fn to_statuses(
        &self,
        world: &str,
        timers: &WorldTimers,
        now: DateTime<Utc>,
    ) -> HashMap<InstanceKey, AuthoritativeStatus> {
        let mut statuses = HashMap::with_capacity(timers.timers.len());
        for (timer_key, record) in &timers.timers {
            let Some(id) = record.id.or_else(|| leading_id(timer_key)) else {
                debug!(world = %world, timer = %timer_key, "Timer record without id");
                continue;
            };
            if self.catalogue.get(id).is_none() {
                debug!(world = %world, target = id, "Unknown target id in timer data");
                continue;
            }
            let instance = match Instance::new(record.instance) {
                Ok(instance) => instance,
                Err(e) => {
                    debug!(world = %world, target = id, error = %e, "Skipping timer record");
                    continue;
                }
            };
            statuses.insert(InstanceKey::new(world, id, instance), resolve(record, now));
        }
        statuses
    }
}

#[async_trait]
impl TimerSource for CachedTimerSource {
    async fn refresh(&self) {
        let _guard = self.refresh_lock.lock().await;
        let now = self.clock.now();
        let stale = self.stale_regions(now).await;
        if stale.is_empty() {
            return;
        }

        info!(count = stale.len(), "Querying timer service");
        let results = join_all(stale.iter().map(|region| self.fetcher.fetch(region))).await;

        let mut cache = self.cache.write().await;
        for (region, result) in stale.into_iter().zip(results) {
            let entry = cache.entry(region.clone()).or_default();
            entry.attempted_at = Some(now);
            match result {
                Ok(snapshot) => {
                    debug!(region = %region, worlds = snapshot.len(), "Timer cache updated");
                    entry.fetched_at = Some(now);
                    entry.snapshot = snapshot;
                }
                Err(e) => {
                    warn!(region = %region, error = %e, "Timer fetch failed, keeping stale data");
                }
            }
        }
    }

    async fn load(&self, world: &str) -> TrackerResult<HashMap<InstanceKey, AuthoritativeStatus>> {
        let now = self.clock.now();
        let cache = self.cache.read().await;
        for region in cache.values() {
            if let Some((name, timers)) = region
                .snapshot
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(world))
            {
                return Ok(self.to_statuses(name, timers, now));
            }
        }
        if cache.values().all(|region| region.fetched_at.is_none()) {
            return Err(TrackerError::UpstreamUnavailable {
                region: self.regions.join(","),
                message: "no region fetched yet".to_string(),
            });
        }
        Err(TrackerError::NotFound(format!("world {} has no timer data", world)))
    }

    async fn worlds(&self) -> Vec<String> {
        let cache = self.cache.read().await;
        let names: BTreeSet<String> = cache
            .values()
            .flat_map(|region| region.snapshot.keys().cloned())
            .collect();
        names.into_iter().collect()
    }
}

/// Leading integer of an upstream timer key, e.g. `"6002_1"` -> 6002
fn leading_id(timer_key: &str) -> Option<u32> {
    let digits: String = timer_key
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
