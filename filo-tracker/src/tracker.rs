//! Hunt/FATE Tracker
//!
//! Holds the current authoritative status of every tracked instance key,
//! the found markers set by push reports and the running fate state.
//! State is partitioned per world; each partition has its own lock and
//! no operation ever holds two partitions at once.
//!
//! # Recheck
//!
//! 1. refresh the timer source (cached per region)
//! 2. per world, diff the fresh statuses against the current ones and
//!    swap them in under one write lock
//! 3. route every change, feed deaths to the trains
//!
//! Keys missing from a fresh snapshot keep their last status. A world
//! absent from every snapshot has nothing to diff and counts as checked.

use chrono::{DateTime, Duration, Utc};
use filo_core::constants::{DEFAULT_FATE_DURATION_SECS, RECHECK_PARALLELISM};
use filo_core::{
    worlds, AuthoritativeStatus, Catalogue, Category, Clock, Coords, FateProgress, HuntStatus,
    Instance, InstanceKey, Report, TargetDefinition,
};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::{window, TrackerConfig};
use crate::error::{TrackerError, TrackerResult};
use crate::ingest::NormalizedReport;
use crate::router::SubscriptionRouter;
use crate::timer_source::TimerSource;
use crate::train::TrainRegistry;

/// Found marker set by a push report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoundMarker {
    pub found_at: DateTime<Utc>,
    pub coords: Option<Coords>,
    /// Set once the authoritative source reported the death
    pub closed: bool,
}

#[derive(Debug, Clone)]
struct FateState {
    progress: FateProgress,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct WorldState {
    statuses: HashMap<InstanceKey, AuthoritativeStatus>,
    found: HashMap<InstanceKey, FoundMarker>,
    /// Latest death per zone
    deaths: HashMap<String, DateTime<Utc>>,
    fates: HashMap<InstanceKey, FateState>,
}

type Partition = Arc<RwLock<WorldState>>;

/// Result of one recheck cycle
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecheckSummary {
    pub worlds_checked: usize,
    pub worlds_failed: usize,
    pub changes: usize,
}

/// What happened to a find report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum FindOutcome {
    Notified { deliveries: usize, train: bool },
    Duplicate,
    /// Dead targets are reported by the timer source, not by push sources
    Dead,
    /// B ranks and other targets nobody subscribes to
    NotNotifiable,
}

/// What happened to a fate progress report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ProgressOutcome {
    Updated { deliveries: usize },
    Unchanged,
    Closed { deliveries: usize },
}

/// Outcome of an ingested push report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestOutcome {
    Find(FindOutcome),
    Progress(ProgressOutcome),
}

/// Operator view of one instance key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetStatus {
    pub world: String,
    pub target_id: u32,
    pub name: String,
    pub zone: String,
    pub instance: Instance,
    pub status: AuthoritativeStatus,
    pub found: Option<FoundMarker>,
    pub fate: Option<FateProgress>,
}

/// Result of a fate / housekeeping sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SweepSummary {
    pub fates_expired: usize,
    pub ledger_evicted: usize,
}

/// Hunt/FATE tracker
pub struct HuntTracker {
    catalogue: Arc<Catalogue>,
    timers: Arc<dyn TimerSource>,
    router: Arc<SubscriptionRouter>,
    trains: Arc<TrainRegistry>,
    clock: Arc<dyn Clock>,
    config: TrackerConfig,
    ledger_max_age: Duration,
    partitions: RwLock<HashMap<String, Partition>>,
    tracked: RwLock<BTreeSet<String>>,
    recheck_lock: Mutex<()>,
}

impl HuntTracker {
    pub fn new(
        catalogue: Arc<Catalogue>,
        timers: Arc<dyn TimerSource>,
        router: Arc<SubscriptionRouter>,
        trains: Arc<TrainRegistry>,
        clock: Arc<dyn Clock>,
        config: TrackerConfig,
    ) -> Self {
        let ledger_max_age = config.ledger_max_age(&catalogue);
        Self {
            catalogue,
            timers,
            router,
            trains,
            clock,
            config,
            ledger_max_age,
            partitions: RwLock::new(HashMap::new()),
            tracked: RwLock::new(BTreeSet::new()),
            recheck_lock: Mutex::new(()),
        }
    }

    pub fn catalogue(&self) -> &Arc<Catalogue> {
        &self.catalogue
    }

    pub fn router(&self) -> &Arc<SubscriptionRouter> {
        &self.router
    }

    pub fn trains(&self) -> &Arc<TrainRegistry> {
        &self.trains
    }

    // ==================== Worlds ====================

    /// Add a world to the recheck set
    pub async fn track_world(&self, world: &str) -> bool {
        let world = canonical_world(world);
        let added = self.tracked.write().await.insert(world.clone());
        if added {
            info!(world = %world, "Tracking world");
        }
        added
    }

    pub async fn tracked_worlds(&self) -> Vec<String> {
        self.tracked.read().await.iter().cloned().collect()
    }

    /// Pick up every world present in the upstream snapshots
    pub async fn refresh_worlds(&self) -> usize {
        self.timers.refresh().await;
        let mut added = 0;
        for world in self.timers.worlds().await {
            if self.track_world(&world).await {
                added += 1;
            }
        }
        debug!(count = added, "World list refreshed");
        added
    }

    async fn partition(&self, world: &str) -> Partition {
        if let Some(partition) = self.partitions.read().await.get(world) {
            return partition.clone();
        }
        self.partitions
            .write()
            .await
            .entry(world.to_string())
            .or_default()
            .clone()
    }

    // ==================== Recheck ====================

    /// Poll the timer source and route every status change
    ///
    /// A world that fails is logged and retried on the next cycle.
    pub async fn recheck(&self) -> RecheckSummary {
        let _cycle = self.recheck_lock.lock().await;
        self.timers.refresh().await;

        let worlds = self.tracked_worlds().await;
        let results: Vec<(String, TrackerResult<usize>)> = stream::iter(worlds)
            .map(|world| async move {
                let result = self.recheck_world(&world).await;
                (world, result)
            })
            .buffer_unordered(RECHECK_PARALLELISM)
            .collect()
            .await;

        let mut summary = RecheckSummary::default();
        for (world, result) in results {
            match result {
                Ok(changes) => {
                    summary.worlds_checked += 1;
                    summary.changes += changes;
                }
                Err(e) => {
                    summary.worlds_failed += 1;
                    warn!(world = %world, error = %e, "Recheck failed for world");
                }
            }
        }
        debug!(
            worlds = summary.worlds_checked,
            failed = summary.worlds_failed,
            changes = summary.changes,
            "Recheck complete"
        );
        summary
    }

    async fn recheck_world(&self, world: &str) -> TrackerResult<usize> {
        let fresh = match self.timers.load(world).await {
            Ok(fresh) => fresh,
            Err(TrackerError::NotFound(_)) => {
                debug!(world = %world, "No timer data for world");
                return Ok(0);
            }
            Err(e) => return Err(e),
        };
        let now = self.clock.now();
        let partition = self.partition(world).await;

        // Commit first: an interrupted cycle must not route a change twice
        let mut changes: Vec<(InstanceKey, AuthoritativeStatus, AuthoritativeStatus)> = {
            let mut state = partition.write().await;
            let mut changes = Vec::new();
            for (key, new) in fresh {
                let old = state
                    .statuses
                    .get(&key)
                    .filter(|old| old.status != new.status)
                    .cloned();
                if let Some(old) = old {
                    if new.status == HuntStatus::Died {
                        if let Some(marker) = state.found.get_mut(&key) {
                            marker.closed = true;
                        }
                        if let Some(target) = self.catalogue.get(key.target_id) {
                            state
                                .deaths
                                .insert(target.zone.clone(), new.last_death_at.unwrap_or(now));
                        }
                    }
                    changes.push((key.clone(), old, new.clone()));
                }
                state.statuses.insert(key, new);
            }
            changes
        };
        changes.sort_by(|a, b| a.0.cmp(&b.0));

        for (key, old, new) in &changes {
            let Some(target) = self.catalogue.get(key.target_id) else {
                continue;
            };
            info!(
                world = %key.world,
                target = %target.name,
                instance = %key.instance,
                from = %old.status,
                to = %new.status,
                "Status changed"
            );
            self.router.route_change(target, key, old, new, now).await;
            self.trains.on_change(&key.world, target, new.status).await;
        }

        Ok(changes.len())
    }

    // ==================== Push reports ====================

    /// Dispatch a normalized push report
    pub async fn handle_report(&self, report: NormalizedReport) -> TrackerResult<IngestOutcome> {
        match report {
            NormalizedReport::Mark(report) => self.on_find(&report).await.map(IngestOutcome::Find),
            NormalizedReport::Fate(report) => self
                .on_progress(
                    &report.world,
                    &report.fate_id.to_string(),
                    report.progress,
                    report.instance,
                )
                .await
                .map(IngestOutcome::Progress),
        }
    }

    /// Apply a find report
    pub async fn on_find(&self, report: &Report) -> TrackerResult<FindOutcome> {
        let target = self
            .catalogue
            .get(report.target_id)
            .ok_or_else(|| TrackerError::UnknownTarget(report.target_id.to_string()))?;
        let Some(category) = target.category().filter(|_| target.is_notifiable()) else {
            debug!(target = %target.name, rank = %target.rank, "Ignoring find for non-notifiable target");
            return Ok(FindOutcome::NotNotifiable);
        };
        if !report.alive {
            debug!(world = %report.world, target = %target.name, "Ignoring report of a dead target");
            return Ok(FindOutcome::Dead);
        }

        let world = canonical_world(&report.world);
        let key = InstanceKey::new(world.as_str(), target.id, report.instance);
        self.track_world(&world).await;
        let now = self.clock.now();

        let train = {
            let partition = self.partition(&world).await;
            let mut state = partition.write().await;
            if let Err(e) = self.check_duplicate(&state, &key, now) {
                debug!(world = %world, target = %target.name, instance = %key.instance, error = %e, "Dropping find");
                return Ok(FindOutcome::Duplicate);
            }
            state.found.insert(
                key.clone(),
                FoundMarker {
                    found_at: now,
                    coords: report.coords,
                    closed: false,
                },
            );
            category.is_train_eligible() && self.recent_zone_death(&state, target, now)
        };

        info!(
            world = %world,
            target = %target.name,
            instance = %key.instance,
            source = %report.source,
            "Target found"
        );
        let reached = self
            .router
            .route_find(target, &key, category, report.coords, now, &[])
            .await;
        let mut deliveries = reached.len();

        if category.is_train_eligible() {
            if let Some(coords) = report.coords {
                self.trains.set_coords(&world, target.id, coords).await;
            }
        }
        if train {
            // One find message per destination and key
            deliveries += self
                .router
                .route_find(target, &key, Category::Trains, report.coords, now, &reached)
                .await
                .len();
        }

        Ok(FindOutcome::Notified { deliveries, train })
    }

    /// A live marker, or a fresh marker on a target that just died
    fn check_duplicate(&self, state: &WorldState, key: &InstanceKey, now: DateTime<Utc>) -> TrackerResult<()> {
        let Some(marker) = state.found.get(key) else {
            return Ok(());
        };
        let age = now - marker.found_at;
        if !marker.closed && age < self.config.found_stale() {
            return Err(TrackerError::DuplicateReport(format!("{} already found", key)));
        }

        let guard = self.config.find_guard();
        let recent_death = state
            .statuses
            .get(key)
            .and_then(|s| s.last_death_at)
            .is_some_and(|died| now - died < guard);
        if age < guard && recent_death {
            return Err(TrackerError::DuplicateReport(format!("{} died moments ago", key)));
        }
        Ok(())
    }

    fn recent_zone_death(&self, state: &WorldState, target: &TargetDefinition, now: DateTime<Utc>) -> bool {
        state
            .deaths
            .get(&target.zone)
            .is_some_and(|died| now - *died <= self.config.train_death_window())
    }

    /// Apply fate progress; `None` or 100% closes the fate
    pub async fn on_progress(
        &self,
        world: &str,
        fate: &str,
        progress: Option<FateProgress>,
        instance: Instance,
    ) -> TrackerResult<ProgressOutcome> {
        let target = self.catalogue.resolve(fate)?;
        if !target.is_fate() {
            return Err(TrackerError::UnknownTarget(format!("{} is not a fate", target.name)));
        }
        let world = canonical_world(world);
        let key = InstanceKey::new(world.as_str(), target.id, instance);
        self.track_world(&world).await;
        let now = self.clock.now();
        let partition = self.partition(&world).await;

        match progress {
            Some(progress) if !progress.is_complete() => {
                {
                    let mut state = partition.write().await;
                    let unchanged = state.fates.get(&key).is_some_and(|f| {
                        f.progress.progress == progress.progress
                            && f.progress.time_remaining_secs == progress.time_remaining_secs
                    });
                    state.fates.insert(
                        key.clone(),
                        FateState {
                            progress: progress.clone(),
                            updated_at: now,
                        },
                    );
                    if unchanged {
                        return Ok(ProgressOutcome::Unchanged);
                    }
                }
                debug!(world = %world, fate = %target.name, progress = progress.progress, "Fate progress");
                let deliveries = self.router.route_fate(target, &key, Some(&progress), now).await;
                Ok(ProgressOutcome::Updated { deliveries })
            }
            last => {
                partition.write().await.fates.remove(&key);
                info!(world = %world, fate = %target.name, "Fate closed");
                let deliveries = self.router.route_fate(target, &key, last.as_ref(), now).await;
                Ok(ProgressOutcome::Closed { deliveries })
            }
        }
    }

    // ==================== Housekeeping ====================

    /// Close fates that outlived their duration and evict stale ledger entries
    pub async fn sweep(&self) -> SweepSummary {
        let now = self.clock.now();
        let partitions: Vec<Partition> = self.partitions.read().await.values().cloned().collect();

        let mut expired = Vec::new();
        for partition in partitions {
            let mut state = partition.write().await;
            let stale: Vec<InstanceKey> = state
                .fates
                .iter()
                .filter(|(key, fate)| {
                    let secs = self
                        .catalogue
                        .get(key.target_id)
                        .and_then(|t| t.duration_secs)
                        .unwrap_or(DEFAULT_FATE_DURATION_SECS);
                    now - fate.updated_at > window(i64::from(secs))
                })
                .map(|(key, _)| key.clone())
                .collect();
            for key in &stale {
                state.fates.remove(key);
            }
            expired.extend(stale);

            let found_stale = self.config.found_stale();
            state.found.retain(|_, marker| now - marker.found_at < found_stale);
            let death_window = self.config.train_death_window().max(self.config.find_guard());
            state.deaths.retain(|_, died| now - *died <= death_window);
        }

        for key in &expired {
            if let Some(target) = self.catalogue.get(key.target_id) {
                info!(world = %key.world, fate = %target.name, "Fate expired");
                self.router.route_fate(target, key, None, now).await;
            }
        }

        let ledger_evicted = self
            .router
            .ledger()
            .evict_stale(now, self.ledger_max_age)
            .await;

        SweepSummary {
            fates_expired: expired.len(),
            ledger_evicted,
        }
    }

    // ==================== Queries ====================

    /// Status of one target on one world
    pub async fn status(&self, world: &str, target: &str, instance: Instance) -> TrackerResult<TargetStatus> {
        let world = worlds::normalize_world(world)?;
        let target = self.catalogue.resolve(target)?;
        let key = InstanceKey::new(world, target.id, instance);

        let partition = self.partitions.read().await.get(world).cloned();
        let (status, found, fate) = match partition {
            Some(partition) => {
                let state = partition.read().await;
                (
                    state.statuses.get(&key).cloned(),
                    state.found.get(&key).cloned(),
                    state.fates.get(&key).map(|f| f.progress.clone()),
                )
            }
            None => (None, None, None),
        };

        Ok(TargetStatus {
            world: world.to_string(),
            target_id: target.id,
            name: target.name.clone(),
            zone: target.zone.clone(),
            instance,
            status: status.unwrap_or_else(AuthoritativeStatus::closed),
            found,
            fate,
        })
    }
}

/// Title-cased world name from the world table, or the name as given
fn canonical_world(world: &str) -> String {
    worlds::normalize_world(world)
        .map(str::to_string)
        .unwrap_or_else(|_| world.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::NotificationLedger;
    use crate::sink::{Delivery, MockSink};
    use crate::storage::MemorySubscriptionStore;
    use crate::timer_source::{CachedTimerSource, StaticRegionFetcher};
    use chrono::TimeZone;
    use filo_core::{DestinationId, EventKind, ManualClock, TimerRecord};

    const ERLE: u32 = 6002;
    const ORCUS: u32 = 6003;

    struct Fixture {
        tracker: HuntTracker,
        fetcher: Arc<StaticRegionFetcher>,
        clock: Arc<ManualClock>,
        sink: Arc<MockSink>,
    }

    async fn fixture() -> Fixture {
        let catalogue = Arc::new(Catalogue::builtin().unwrap());
        let clock = Arc::new(ManualClock::new(Utc.timestamp_opt(1_700_000_000, 0).unwrap()));
        let fetcher = Arc::new(StaticRegionFetcher::new());
        let sink = Arc::new(MockSink::new());
        let timers = Arc::new(CachedTimerSource::new(
            fetcher.clone(),
            catalogue.clone(),
            clock.clone(),
            vec!["Crystal".to_string()],
            15,
        ));
        let router = Arc::new(SubscriptionRouter::new(
            Arc::new(MemorySubscriptionStore::new()),
            Arc::new(NotificationLedger::new()),
            sink.clone(),
        ));
        let trains = Arc::new(TrainRegistry::new(catalogue.clone(), sink.clone(), clock.clone()));
        let tracker = HuntTracker::new(catalogue, timers, router, trains, clock.clone(), TrackerConfig::default());

        for category in [Category::SbA, Category::Trains] {
            tracker
                .router()
                .subscribe(DestinationId(1), "Mateus", category, &EventKind::ALL)
                .await
                .unwrap();
        }
        tracker.track_world("Mateus").await;

        Fixture {
            tracker,
            fetcher,
            clock,
            sink,
        }
    }

    fn open_record(now: DateTime<Utc>) -> TimerRecord {
        TimerRecord {
            world: "Mateus".to_string(),
            instance: 1,
            open_date: Some((now - Duration::seconds(10)).timestamp_millis()),
            max_date: Some((now + Duration::seconds(600)).timestamp_millis()),
            ..Default::default()
        }
    }

    fn dead_record(now: DateTime<Utc>, died: DateTime<Utc>) -> TimerRecord {
        TimerRecord {
            world: "Mateus".to_string(),
            instance: 1,
            open_date: Some((now + Duration::hours(4)).timestamp_millis()),
            max_date: Some((now + Duration::hours(6)).timestamp_millis()),
            last_death: Some(died.timestamp_millis()),
            ..Default::default()
        }
    }

    fn erle_report(f: &Fixture) -> Report {
        Report {
            world: "Mateus".to_string(),
            target_id: ERLE,
            instance: Instance::FIRST,
            alive: true,
            coords: Some(Coords::new(10.0, 10.0)),
            observed_at: f.clock.now(),
            rank_hint: None,
            source: "xivhunt".to_string(),
        }
    }

    async fn set_timer(f: &Fixture, target: u32, record: TimerRecord) {
        f.fetcher
            .set_timer("Crystal", "Mateus", &format!("{}_1", target), record)
            .await;
    }

    #[tokio::test]
    async fn test_find_notifies_once() {
        let f = fixture().await;

        let first = f.tracker.on_find(&erle_report(&f)).await.unwrap();
        assert_eq!(first, FindOutcome::Notified { deliveries: 1, train: false });

        f.clock.advance(Duration::seconds(1));
        let second = f.tracker.on_find(&erle_report(&f)).await.unwrap();
        assert_eq!(second, FindOutcome::Duplicate);

        let sent = f.sink.sent().await;
        assert_eq!(sent.len(), 1);
        assert!(sent[0].notification.content.contains("Erle found in The Fringes, Mateus"));
    }

    #[tokio::test]
    async fn test_find_filters_rank_and_dead_reports() {
        let f = fixture().await;

        let mut report = erle_report(&f);
        report.target_id = 5993;
        assert_eq!(f.tracker.on_find(&report).await.unwrap(), FindOutcome::NotNotifiable);

        let mut report = erle_report(&f);
        report.alive = false;
        assert_eq!(f.tracker.on_find(&report).await.unwrap(), FindOutcome::Dead);

        let mut report = erle_report(&f);
        report.target_id = 1;
        assert!(matches!(
            f.tracker.on_find(&report).await,
            Err(TrackerError::UnknownTarget(_))
        ));
        assert!(f.sink.sent().await.is_empty());
    }

    #[tokio::test]
    async fn test_recheck_is_idempotent() {
        let f = fixture().await;
        let now = f.clock.now();
        set_timer(&f, ERLE, dead_record(now, now - Duration::hours(1))).await;

        assert_eq!(f.tracker.recheck().await.changes, 0);

        set_timer(&f, ERLE, open_record(now)).await;
        f.clock.advance(Duration::seconds(20));
        let summary = f.tracker.recheck().await;
        assert_eq!(summary.changes, 1);
        assert_eq!(summary.worlds_checked, 1);

        f.clock.advance(Duration::seconds(20));
        assert_eq!(f.tracker.recheck().await.changes, 0);
        assert_eq!(f.sink.sent().await.len(), 1);

        let status = f.tracker.status("mateus", "erle", Instance::FIRST).await.unwrap();
        assert_eq!(status.status.status, HuntStatus::Opened);
    }

    #[tokio::test]
    async fn test_world_without_timer_data_counts_as_checked() {
        let f = fixture().await;
        f.tracker.track_world("Zalera").await;
        set_timer(&f, ERLE, open_record(f.clock.now())).await;

        let summary = f.tracker.recheck().await;
        assert_eq!(summary.worlds_checked, 2);
        assert_eq!(summary.worlds_failed, 0);
    }

    #[tokio::test]
    async fn test_unreachable_timer_service_fails_worlds() {
        let f = fixture().await;
        f.fetcher.set_failing("Crystal", true).await;
        let summary = f.tracker.recheck().await;
        assert_eq!((summary.worlds_checked, summary.worlds_failed), (0, 1));

        f.fetcher.set_failing("Crystal", false).await;
        set_timer(&f, ERLE, open_record(f.clock.now())).await;
        f.clock.advance(Duration::seconds(20));
        let summary = f.tracker.recheck().await;
        assert_eq!((summary.worlds_checked, summary.worlds_failed), (1, 0));
    }

    #[tokio::test]
    async fn test_key_missing_from_snapshot_keeps_status() {
        let f = fixture().await;
        let now = f.clock.now();
        set_timer(&f, ERLE, open_record(now)).await;
        set_timer(&f, ORCUS, open_record(now)).await;
        f.tracker.recheck().await;

        f.fetcher
            .remove_timer("Crystal", "Mateus", &format!("{}_1", ORCUS))
            .await;
        f.clock.advance(Duration::seconds(20));
        let summary = f.tracker.recheck().await;
        assert_eq!(summary.changes, 0);
        assert!(f.sink.sent().await.is_empty());

        let status = f.tracker.status("Mateus", "orcus", Instance::FIRST).await.unwrap();
        assert_eq!(status.status.status, HuntStatus::Opened);
    }

    #[tokio::test]
    async fn test_interrupted_recheck_does_not_repeat_changes() {
        let f = fixture().await;
        let now = f.clock.now();
        set_timer(&f, ERLE, dead_record(now, now - Duration::hours(1))).await;
        set_timer(&f, ORCUS, dead_record(now, now - Duration::hours(1))).await;
        f.tracker.recheck().await;

        set_timer(&f, ERLE, open_record(now)).await;
        set_timer(&f, ORCUS, open_record(now)).await;
        f.clock.advance(Duration::seconds(20));
        f.sink.set_delay(Some(std::time::Duration::from_millis(500))).await;
        let interrupted =
            tokio::time::timeout(std::time::Duration::from_millis(50), f.tracker.recheck()).await;
        assert!(interrupted.is_err());

        f.sink.set_delay(None).await;
        f.clock.advance(Duration::seconds(20));
        assert_eq!(f.tracker.recheck().await.changes, 0);
        f.clock.advance(Duration::seconds(20));
        assert_eq!(f.tracker.recheck().await.changes, 0);

        for name in ["Erle", "Orcus"] {
            let opened = f
                .sink
                .sent_to(DestinationId(1))
                .await
                .iter()
                .filter(|d| d.notification.content.contains(name))
                .count();
            assert!(opened <= 1);
            let status = f
                .tracker
                .status("Mateus", &name.to_lowercase(), Instance::FIRST)
                .await
                .unwrap();
            assert_eq!(status.status.status, HuntStatus::Opened);
        }
    }

    #[tokio::test]
    async fn test_death_edits_find_and_guards_repeat() {
        let f = fixture().await;
        let now = f.clock.now();
        set_timer(&f, ERLE, open_record(now)).await;
        f.tracker.recheck().await;

        f.tracker.on_find(&erle_report(&f)).await.unwrap();
        assert_eq!(f.sink.sent().await.len(), 1);

        f.clock.advance(Duration::seconds(60));
        let died = f.clock.now();
        set_timer(&f, ERLE, dead_record(died, died)).await;
        assert_eq!(f.tracker.recheck().await.changes, 1);

        let edits = f.sink.edits().await;
        assert_eq!(edits.len(), 1);
        assert!(edits[0].notification.content.ends_with("after 60 seconds"));

        f.clock.advance(Duration::seconds(30));
        assert_eq!(
            f.tracker.on_find(&erle_report(&f)).await.unwrap(),
            FindOutcome::Duplicate
        );

        f.clock.advance(Duration::minutes(10));
        assert!(matches!(
            f.tracker.on_find(&erle_report(&f)).await.unwrap(),
            FindOutcome::Notified { .. }
        ));
    }

    #[tokio::test]
    async fn test_old_find_with_recent_death_is_accepted() {
        let f = fixture().await;
        set_timer(&f, ERLE, open_record(f.clock.now())).await;
        f.tracker.recheck().await;
        f.tracker.on_find(&erle_report(&f)).await.unwrap();

        f.clock.advance(Duration::minutes(6));
        let died = f.clock.now();
        set_timer(&f, ERLE, dead_record(died, died)).await;
        assert_eq!(f.tracker.recheck().await.changes, 1);

        f.clock.advance(Duration::seconds(30));
        assert!(matches!(
            f.tracker.on_find(&erle_report(&f)).await.unwrap(),
            FindOutcome::Notified { .. }
        ));
        assert_eq!(f.sink.sent().await.len(), 2);
    }

    async fn kill_erle_near_orcus(f: &Fixture) {
        let now = f.clock.now();
        set_timer(f, ERLE, open_record(now)).await;
        set_timer(f, ORCUS, open_record(now)).await;
        f.tracker.recheck().await;

        f.clock.advance(Duration::seconds(20));
        let died = f.clock.now();
        set_timer(f, ERLE, dead_record(died, died)).await;
        f.tracker.recheck().await;
    }

    fn orcus_report(f: &Fixture) -> Report {
        Report {
            target_id: ORCUS,
            ..erle_report(f)
        }
    }

    #[tokio::test]
    async fn test_find_after_zone_death_feeds_train() {
        let f = fixture().await;
        f.tracker
            .router()
            .subscribe(DestinationId(2), "Mateus", Category::Trains, &EventKind::ALL)
            .await
            .unwrap();
        f.tracker.trains().start_train("Mateus", None, None).await.unwrap();
        kill_erle_near_orcus(&f).await;

        let view = f.tracker.trains().view("Mateus").await.unwrap();
        assert_eq!(view.previous_target.as_deref(), Some("Erle"));

        f.clock.advance(Duration::seconds(30));
        let outcome = f.tracker.on_find(&orcus_report(&f)).await.unwrap();
        assert_eq!(outcome, FindOutcome::Notified { deliveries: 2, train: true });

        let orcus_finds = |deliveries: Vec<Delivery>| -> Vec<Delivery> {
            deliveries
                .into_iter()
                .filter(|d| d.notification.content.contains("Orcus found"))
                .collect()
        };
        let first = orcus_finds(f.sink.sent_to(DestinationId(1)).await);
        assert_eq!(first.len(), 1);
        assert!(!first[0].notification.content.ends_with("(train in progress)"));
        let second = orcus_finds(f.sink.sent_to(DestinationId(2)).await);
        assert_eq!(second.len(), 1);
        assert!(second[0].notification.content.ends_with("(train in progress)"));

        f.clock.advance(Duration::seconds(90));
        let died = f.clock.now();
        set_timer(&f, ORCUS, dead_record(died, died)).await;
        f.tracker.recheck().await;

        let edits = f.sink.edits().await;
        for handle in [&first[0].handle, &second[0].handle] {
            assert!(edits.iter().any(|e| &e.handle == handle));
        }
        assert!(f.tracker.router().ledger().is_empty().await);
    }

    #[tokio::test]
    async fn test_stale_zone_death_does_not_start_train() {
        let f = fixture().await;
        kill_erle_near_orcus(&f).await;

        f.clock.advance(TrackerConfig::default().train_death_window() + Duration::seconds(1));
        let outcome = f.tracker.on_find(&orcus_report(&f)).await.unwrap();
        assert_eq!(outcome, FindOutcome::Notified { deliveries: 1, train: false });
        assert!(f
            .sink
            .sent()
            .await
            .iter()
            .all(|d| !d.notification.content.ends_with("(train in progress)")));
    }

    #[tokio::test]
    async fn test_fate_progress_and_expiry() {
        let f = fixture().await;
        f.tracker
            .router()
            .subscribe(DestinationId(1), "Mateus", Category::Fate, &[EventKind::Find])
            .await
            .unwrap();

        let progress = |p: u8| FateProgress {
            progress: p,
            time_remaining_secs: Some(600),
            coords: None,
            observed_at: f.clock.now(),
        };

        let outcome = f
            .tracker
            .on_progress("Mateus", "long live the coeurl", Some(progress(20)), Instance::FIRST)
            .await
            .unwrap();
        assert_eq!(outcome, ProgressOutcome::Updated { deliveries: 1 });
        assert_eq!(
            f.tracker
                .on_progress("Mateus", "long live the coeurl", Some(progress(20)), Instance::FIRST)
                .await
                .unwrap(),
            ProgressOutcome::Unchanged
        );
        f.tracker
            .on_progress("Mateus", "long live the coeurl", Some(progress(60)), Instance::FIRST)
            .await
            .unwrap();
        assert_eq!(f.sink.sent().await.len(), 1);
        assert_eq!(f.sink.edits().await.len(), 1);

        assert!(f
            .tracker
            .on_progress("Mateus", "erle", Some(progress(60)), Instance::FIRST)
            .await
            .is_err());

        f.clock.advance(Duration::seconds(1801));
        let sweep = f.tracker.sweep().await;
        assert_eq!(sweep.fates_expired, 1);
        assert!(f.sink.edits().await[1].notification.content.ends_with("ended"));
    }

    #[tokio::test]
    async fn test_status_lookup_errors() {
        let f = fixture().await;
        assert!(f
            .tracker
            .status("Atlantis", "erle", Instance::FIRST)
            .await
            .unwrap_err()
            .is_not_found());
        assert!(f
            .tracker
            .status("Mateus", "nobody", Instance::FIRST)
            .await
            .unwrap_err()
            .is_not_found());

        let status = f.tracker.status("Mateus", "6002", Instance::FIRST).await.unwrap();
        assert_eq!(status.status.status, HuntStatus::Closed);
        assert!(status.found.is_none());
    }
}
