//! Train Conductor
//!
//! A train is an organised sweep of the Stormblood A ranks on one world
//! along a fixed route. The [`Conductor`] tracks what is left, what was
//! killed last and which targets are most likely next; the
//! [`TrainRegistry`] keeps one conductor per world and keeps the
//! announcement message of each train up to date.

use chrono::{DateTime, Utc};
use filo_core::{
    format_duration, worlds, Catalogue, Clock, Coords, DestinationId, HuntStatus, MessageHandle,
    TargetDefinition,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{TrackerError, TrackerResult};
use crate::sink::{DestinationSink, Notification, RichPayload, SinkError};

const TRAIN_TITLE: &str = "Stormblood Hunt Train";
const COLOR_RUNNING: u32 = 0x7C_B5_18;
const COLOR_FINISHED: u32 = 0xFB_61_07;

/// Train lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrainPhase {
    NotStarted,
    InProgress,
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct TrainStop {
    target_id: u32,
    name: String,
    zone: String,
}

impl TrainStop {
    fn from_target(target: &TargetDefinition) -> Self {
        Self {
            target_id: target.id,
            name: target.name.clone(),
            zone: target.zone.clone(),
        }
    }
}

/// Rendered state of a train
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainView {
    pub world: String,
    pub phase: TrainPhase,
    pub starting_target: String,
    pub previous_target: Option<String>,
    pub next_targets: Vec<String>,
    pub kills: usize,
    pub total: usize,
    pub percentage: u32,
    pub started_at: DateTime<Utc>,
    /// Elapsed time, set once the train finished
    pub duration: Option<String>,
}

impl TrainView {
    pub fn to_notification(&self) -> Notification {
        match self.phase {
            TrainPhase::Finished => {
                let duration = self.duration.clone().unwrap_or_default();
                Notification::new(format!("{} on {} finished after {}", TRAIN_TITLE, self.world, duration))
                    .with_rich(
                        RichPayload::new(TRAIN_TITLE)
                            .description(self.world.clone())
                            .field("Duration", duration)
                            .color(COLOR_FINISHED)
                            .footer("Completion date"),
                    )
            }
            _ => {
                let progress = format!("{} / {} ({}%)", self.kills, self.total, self.percentage);
                let mut rich = RichPayload::new(TRAIN_TITLE)
                    .description(self.world.clone())
                    .color(COLOR_RUNNING)
                    .footer("Last updated");
                let content = match &self.previous_target {
                    Some(previous) => {
                        rich = rich.field("Previous target", previous.clone());
                        format!("{} on {}: {} down, {}", TRAIN_TITLE, self.world, previous, progress)
                    }
                    None => {
                        rich = rich.field("Starting target", self.starting_target.clone());
                        format!("{} on {} starting at {}", TRAIN_TITLE, self.world, self.starting_target)
                    }
                };
                if !self.next_targets.is_empty() {
                    rich = rich.field("Next targets", self.next_targets.join("\n"));
                }
                Notification::new(content).with_rich(rich.field("Progress", progress))
            }
        }
    }
}

/// Sequencer over the train route of one world
#[derive(Debug, Clone)]
pub struct Conductor {
    world: String,
    remaining: Vec<TrainStop>,
    first: TrainStop,
    previous: Option<TrainStop>,
    next: Vec<String>,
    coords: HashMap<u32, Coords>,
    started_at: DateTime<Utc>,
    finished_at: Option<DateTime<Utc>>,
    total: usize,
}

impl Conductor {
    /// Build a train over the catalogue's route, optionally starting
    /// somewhere other than the first stop
    pub fn new(
        catalogue: &Catalogue,
        world: &str,
        starting_target: Option<&str>,
        now: DateTime<Utc>,
    ) -> TrackerResult<Self> {
        let world = worlds::normalize_world(world)?.to_string();
        let remaining: Vec<TrainStop> = catalogue
            .train_route()
            .into_iter()
            .map(TrainStop::from_target)
            .collect();

        let first = match starting_target {
            Some(name) => {
                let target = catalogue
                    .find_by_name(name)
                    .ok_or_else(|| TrackerError::UnknownTarget(name.to_string()))?;
                remaining
                    .iter()
                    .find(|stop| stop.target_id == target.id)
                    .cloned()
                    .ok_or_else(|| TrackerError::UnknownTarget(format!("{} is not on the train route", target.name)))?
            }
            None => remaining
                .first()
                .cloned()
                .ok_or_else(|| TrackerError::Configuration("train route is empty".to_string()))?,
        };

        Ok(Self {
            world,
            total: remaining.len(),
            remaining,
            first,
            previous: None,
            next: Vec::new(),
            coords: HashMap::new(),
            started_at: now,
            finished_at: None,
        })
    }

    pub fn world(&self) -> &str {
        &self.world
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    pub fn phase(&self) -> TrainPhase {
        if self.finished_at.is_some() {
            TrainPhase::Finished
        } else if self.previous.is_none() {
            TrainPhase::NotStarted
        } else {
            TrainPhase::InProgress
        }
    }

    /// Whether `name` is still ahead on the route
    pub fn hunt_is_in_train(&self, name: &str) -> bool {
        let name = name.trim();
        self.remaining.iter().any(|stop| stop.name.eq_ignore_ascii_case(name))
    }

    /// Last known position of a route target
    pub fn set_coords(&mut self, target_id: u32, coords: Coords) {
        self.coords.insert(target_id, coords);
    }

    /// Remove a killed target and work out the likely next stops
    ///
    /// Returns `false` when the target is not on the remaining route.
    pub fn log_kill(&mut self, name: &str, now: DateTime<Utc>) -> bool {
        let name = name.trim();
        let Some(index) = self
            .remaining
            .iter()
            .position(|stop| stop.name.eq_ignore_ascii_case(name))
        else {
            warn!(world = %self.world, target = %name, "Kill logged for a target not on the train");
            return false;
        };

        let killed = self.remaining[index].clone();
        let mut next = Vec::with_capacity(2);
        let mut successor = None;
        let mut finished = false;

        match self.remaining.get(index + 1) {
            Some(stop) => {
                next.push(self.describe(stop));
                successor = Some(stop.name.clone());
            }
            None if self.remaining.len() > 1 => next.push(self.describe(&self.remaining[0])),
            None => finished = true,
        }

        if !finished {
            let same_zone = self.remaining.iter().find(|stop| {
                stop.zone == killed.zone
                    && stop.name != killed.name
                    && successor.as_ref().is_some_and(|s| *s != stop.name)
            });
            match same_zone {
                Some(stop) => next.insert(0, self.describe(stop)),
                None => {
                    if let Some(alternative) = self.remaining.get(index + 2) {
                        next.push(self.describe(alternative));
                    }
                }
            }
        }

        self.remaining.remove(index);
        self.next = next;
        self.previous = Some(killed);
        if finished || self.remaining.is_empty() {
            self.next.clear();
            self.finished_at = Some(now);
            info!(world = %self.world, "Train finished");
        } else {
            debug!(
                world = %self.world,
                target = %name,
                remaining = self.remaining.len(),
                "Train kill logged"
            );
        }
        true
    }

    fn describe(&self, stop: &TrainStop) -> String {
        match self.coords.get(&stop.target_id) {
            Some(coords) => format!("{} • {} • {}", stop.name, stop.zone, coords),
            None => format!("{} • ({})", stop.name, stop.zone),
        }
    }

    /// Current summary of the train
    pub fn next_view(&self, now: DateTime<Utc>) -> TrainView {
        let kills = self.total - self.remaining.len();
        let percentage = if kills == 0 {
            0
        } else {
            ((kills as f64 / self.total as f64) * 100.0).round() as u32
        };
        let duration = self
            .finished_at
            .map(|end| format_duration((end.min(now) - self.started_at).num_seconds()));

        TrainView {
            world: self.world.clone(),
            phase: self.phase(),
            starting_target: self.first.name.clone(),
            previous_target: self.previous.as_ref().map(|p| p.name.clone()),
            next_targets: self.next.clone(),
            kills,
            total: self.total,
            percentage,
            started_at: self.started_at,
            duration,
        }
    }
}

struct ActiveTrain {
    conductor: Conductor,
    destination: Option<DestinationId>,
    message: Option<MessageHandle>,
}

/// One train per world, with an optional announcement message
pub struct TrainRegistry {
    catalogue: Arc<Catalogue>,
    sink: Arc<dyn DestinationSink>,
    clock: Arc<dyn Clock>,
    trains: RwLock<HashMap<String, ActiveTrain>>,
}

impl TrainRegistry {
    pub fn new(catalogue: Arc<Catalogue>, sink: Arc<dyn DestinationSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            catalogue,
            sink,
            clock,
            trains: RwLock::new(HashMap::new()),
        }
    }

    /// Start a train, replacing any train already running on the world
    pub async fn start_train(
        &self,
        world: &str,
        starting_target: Option<&str>,
        destination: Option<DestinationId>,
    ) -> TrackerResult<TrainView> {
        let now = self.clock.now();
        let conductor = Conductor::new(&self.catalogue, world, starting_target, now)?;
        let world = conductor.world().to_string();
        let view = conductor.next_view(now);

        let message = match destination {
            Some(dest) => self.announce(dest, None, &view).await,
            None => None,
        };

        let replaced = self.trains.write().await.insert(
            world.clone(),
            ActiveTrain {
                conductor,
                destination,
                message,
            },
        );
        if replaced.is_some() {
            info!(world = %world, "Replaced running train");
        }
        info!(world = %world, start = %view.starting_target, "Train started");
        Ok(view)
    }

    /// Log a kill by name; `NotFound` when no train runs on the world
    pub async fn log_kill(&self, world: &str, name: &str) -> TrackerResult<TrainView> {
        let world = worlds::normalize_world(world)?;
        let name = self
            .catalogue
            .find_by_name(name)
            .map_or_else(|| name.to_string(), |t| t.name.clone());
        let now = self.clock.now();
        let (view, announcement, killed) = {
            let mut trains = self.trains.write().await;
            let train = trains
                .get_mut(world)
                .ok_or_else(|| TrackerError::NotFound(format!("no train running on {}", world)))?;
            let killed = train.conductor.log_kill(&name, now);
            (
                train.conductor.next_view(now),
                train.destination.map(|d| (d, train.message.clone())),
                killed,
            )
        };

        if killed {
            self.publish(world, announcement, &view).await;
        }
        Ok(view)
    }

    /// Feed an authoritative status change into the world's train
    pub async fn on_change(&self, world: &str, target: &TargetDefinition, new: HuntStatus) -> Option<TrainView> {
        if new != HuntStatus::Died || !target.category().is_some_and(|c| c.is_train_eligible()) {
            return None;
        }
        let now = self.clock.now();
        let (view, announcement) = {
            let mut trains = self.trains.write().await;
            let train = trains.get_mut(world)?;
            if !train.conductor.hunt_is_in_train(&target.name) {
                return None;
            }
            train.conductor.log_kill(&target.name, now);
            (
                train.conductor.next_view(now),
                train.destination.map(|d| (d, train.message.clone())),
            )
        };

        self.publish(world, announcement, &view).await;
        Some(view)
    }

    /// Remember the position of a route target reported by a push source
    pub async fn set_coords(&self, world: &str, target_id: u32, coords: Coords) {
        if let Some(train) = self.trains.write().await.get_mut(world) {
            train.conductor.set_coords(target_id, coords);
        }
    }

    pub async fn view(&self, world: &str) -> TrackerResult<TrainView> {
        let world = worlds::normalize_world(world)?;
        self.trains
            .read()
            .await
            .get(world)
            .map(|t| t.conductor.next_view(self.clock.now()))
            .ok_or_else(|| TrackerError::NotFound(format!("no train running on {}", world)))
    }

    pub async fn cancel_train(&self, world: &str) -> TrackerResult<()> {
        let world = worlds::normalize_world(world)?;
        match self.trains.write().await.remove(world) {
            Some(_) => {
                info!(world = %world, "Train cancelled");
                Ok(())
            }
            None => Err(TrackerError::NotFound(format!("no train running on {}", world))),
        }
    }

    pub async fn is_running(&self, world: &str) -> bool {
        self.trains.read().await.contains_key(world)
    }

    /// Update the announcement and drop the train once it finished
    async fn publish(
        &self,
        world: &str,
        announcement: Option<(DestinationId, Option<MessageHandle>)>,
        view: &TrainView,
    ) {
        let message = match announcement {
            Some((dest, handle)) => self.announce(dest, handle, view).await,
            None => None,
        };

        let mut trains = self.trains.write().await;
        if view.phase == TrainPhase::Finished {
            trains.remove(world);
            return;
        }
        if let (Some(train), Some(message)) = (trains.get_mut(world), message) {
            train.message = Some(message);
        }
    }

    /// Edit the announcement in place, posting a new one when it is gone
    async fn announce(
        &self,
        destination: DestinationId,
        handle: Option<MessageHandle>,
        view: &TrainView,
    ) -> Option<MessageHandle> {
        let notification = view.to_notification();
        if let Some(handle) = handle {
            match self.sink.edit(destination, &handle, &notification).await {
                Ok(()) => return Some(handle),
                Err(SinkError::NotFound) => {
                    debug!(destination = %destination, "Train announcement deleted, posting a new one");
                }
                Err(e) => {
                    warn!(destination = %destination, error = %e, "Failed to update train announcement");
                    return Some(handle);
                }
            }
        }
        match self.sink.send(destination, &notification).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(destination = %destination, error = %e, "Failed to post train announcement");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MockSink;
    use filo_core::catalogue::TRAIN_ROUTE;
    use filo_core::ManualClock;

    fn conductor(start: Option<&str>) -> Conductor {
        let catalogue = Catalogue::builtin().unwrap();
        Conductor::new(&catalogue, "mateus", start, Utc::now()).unwrap()
    }

    #[test]
    fn test_completes_after_every_route_kill() {
        let mut train = conductor(None);
        let now = Utc::now();
        assert_eq!(train.phase(), TrainPhase::NotStarted);
        assert_eq!(train.total(), TRAIN_ROUTE.len());

        for (i, name) in TRAIN_ROUTE.iter().enumerate() {
            assert!(!train.is_finished());
            assert!(train.log_kill(name, now));
            assert_eq!(train.remaining(), TRAIN_ROUTE.len() - i - 1);
        }
        assert_eq!(train.phase(), TrainPhase::Finished);
        assert!(train.next_view(now).duration.is_some());
    }

    #[test]
    fn test_non_member_kill_is_noop() {
        let mut train = conductor(None);
        let now = Utc::now();
        assert!(!train.log_kill("Mirka", now));
        assert!(train.log_kill("Erle", now));
        assert!(!train.log_kill("erle", now));
        assert_eq!(train.remaining(), TRAIN_ROUTE.len() - 1);
        assert_eq!(train.phase(), TrainPhase::InProgress);
    }

    #[test]
    fn test_next_candidates() {
        let mut train = conductor(None);
        let now = Utc::now();

        // Orcus shares The Fringes with Erle and is also the route successor
        train.log_kill("erle", now);
        let view = train.next_view(now);
        assert_eq!(view.previous_target.as_deref(), Some("Erle"));
        assert_eq!(
            view.next_targets,
            vec!["Orcus • (The Fringes)".to_string(), "Vochstein • (The Peaks)".to_string()]
        );

        // Killing Aqrabuamelu ahead of Vochstein puts its zone partner first
        train.set_coords(6006, Coords::new(12.3, 30.1));
        train.log_kill("orcus", now);
        train.log_kill("aqrabuamelu", now);
        let view = train.next_view(now);
        assert_eq!(view.next_targets[0], "Vochstein • (The Peaks)");
        assert_eq!(view.next_targets[1], "Mahisha • The Lochs • (12.3, 30.1)");
        assert_eq!((view.kills, view.percentage), (3, 25));
    }

    #[test]
    fn test_wraps_to_route_start() {
        let mut train = conductor(Some("sum"));
        let now = Utc::now();
        assert_eq!(train.next_view(now).starting_target, "Sum");

        train.log_kill("sum", now);
        let view = train.next_view(now);
        assert_eq!(view.next_targets, vec!["Erle • (The Fringes)".to_string()]);
    }

    #[test]
    fn test_rejects_start_off_route() {
        let catalogue = Catalogue::builtin().unwrap();
        assert!(Conductor::new(&catalogue, "Mateus", Some("Mirka"), Utc::now()).is_err());
        assert!(Conductor::new(&catalogue, "Atlantis", None, Utc::now()).is_err());
    }

    #[tokio::test]
    async fn test_registry_edits_announcement_and_drops_finished_train() {
        let catalogue = Arc::new(Catalogue::builtin().unwrap());
        let sink = Arc::new(MockSink::new());
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let registry = TrainRegistry::new(catalogue.clone(), sink.clone(), clock.clone());

        let view = registry
            .start_train("Mateus", None, Some(DestinationId(9)))
            .await
            .unwrap();
        assert_eq!(view.phase, TrainPhase::NotStarted);
        assert_eq!(sink.sent().await.len(), 1);

        let mirka = catalogue.find_by_name("mirka").unwrap();
        assert!(registry.on_change("Mateus", mirka, HuntStatus::Died).await.is_none());

        for name in TRAIN_ROUTE {
            clock.advance(chrono::Duration::minutes(7));
            let target = catalogue.find_by_name(name).unwrap();
            registry.on_change("Mateus", target, HuntStatus::Died).await.unwrap();
        }

        assert_eq!(sink.sent().await.len(), 1);
        let edits = sink.edits().await;
        assert_eq!(edits.len(), TRAIN_ROUTE.len());
        assert!(edits
            .last()
            .unwrap()
            .notification
            .content
            .ends_with("finished after 1 hours, 24 minutes, 0 seconds"));
        assert!(!registry.is_running("Mateus").await);
        assert!(registry.log_kill("Mateus", "erle").await.unwrap_err().is_not_found());
    }
}
