//! Subscription Router
//!
//! Maps (world, category, event kind) to subscribed destinations and
//! delivers events to them through a [`DestinationSink`].
//!
//! # Delivery failures
//!
//! - `Unreachable`: every subscription of the destination is purged
//! - `Forbidden`: skipped and logged, subscriptions kept
//! - `NotFound` on edit: the ledger entry is dropped silently
//!
//! # Change routing
//!
//! Status changes are matched against [`CHANGE_RULES`] in order and the
//! first rule that applies to a subscription wins, so a subscription
//! receives at most one message per change.

use chrono::{DateTime, Utc};
use filo_core::{
    worlds, AuthoritativeStatus, Category, Coords, DestinationId, EventKind, FateProgress,
    HuntStatus, InstanceKey, MessageHandle, Subscription, TargetDefinition,
};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::{TrackerError, TrackerResult};
use crate::ledger::NotificationLedger;
use crate::render;
use crate::sink::{DestinationSink, Notification, SinkError};
use crate::storage::{DestinationMeta, SubscriptionStore};

/// One routing rule for authoritative status changes
#[derive(Debug, Clone, Copy)]
pub struct ChangeRule {
    pub name: &'static str,
    /// Subscription kind the rule delivers to
    pub event_kind: EventKind,
    applies: fn(HuntStatus, HuntStatus) -> bool,
}

impl ChangeRule {
    pub fn applies(&self, old: HuntStatus, new: HuntStatus) -> bool {
        (self.applies)(old, new)
    }
}

fn is_open(status: HuntStatus) -> bool {
    matches!(status, HuntStatus::Opened | HuntStatus::Maxed)
}

/// Change rules in evaluation order: OPENED, MAXED, DIED
pub const CHANGE_RULES: [ChangeRule; 3] = [
    ChangeRule {
        name: "opened",
        event_kind: EventKind::Open,
        applies: |old, new| !is_open(old) && is_open(new),
    },
    ChangeRule {
        name: "maxed",
        event_kind: EventKind::Open,
        applies: |old, new| old != HuntStatus::Maxed && new == HuntStatus::Maxed,
    },
    ChangeRule {
        name: "died",
        event_kind: EventKind::Death,
        applies: |old, new| old != HuntStatus::Died && new == HuntStatus::Died,
    },
];

/// First rule matching a subscription's kind and the transition
pub fn first_matching_rule(event_kind: EventKind, old: HuntStatus, new: HuntStatus) -> Option<&'static ChangeRule> {
    CHANGE_RULES
        .iter()
        .find(|rule| rule.event_kind == event_kind && rule.applies(old, new))
}

/// An event ready for routing
#[derive(Debug, Clone)]
pub struct RoutedEvent {
    pub key: InstanceKey,
    pub category: Category,
    pub event_kind: EventKind,
    pub notification: Notification,
    /// Recorded in the ledger for FIND deliveries
    pub found_at: DateTime<Utc>,
}

/// Subscription router
pub struct SubscriptionRouter {
    store: Arc<dyn SubscriptionStore>,
    ledger: Arc<NotificationLedger>,
    sink: Arc<dyn DestinationSink>,
}

impl SubscriptionRouter {
    pub fn new(
        store: Arc<dyn SubscriptionStore>,
        ledger: Arc<NotificationLedger>,
        sink: Arc<dyn DestinationSink>,
    ) -> Self {
        Self { store, ledger, sink }
    }

    pub fn ledger(&self) -> &Arc<NotificationLedger> {
        &self.ledger
    }

    pub fn sink(&self) -> &Arc<dyn DestinationSink> {
        &self.sink
    }

    // ==================== Subscriptions ====================

    /// Subscribe a destination; returns the number of new subscriptions
    pub async fn subscribe(
        &self,
        destination: DestinationId,
        world: &str,
        category: Category,
        kinds: &[EventKind],
    ) -> TrackerResult<usize> {
        let world = worlds::normalize_world(world)?;
        let mut added = 0;
        for kind in kinds {
            if self
                .store
                .insert(&Subscription::new(destination, world, category, *kind))
                .await?
            {
                added += 1;
            }
        }
        info!(
            destination = %destination,
            world = %world,
            category = %category,
            count = added,
            "Subscribed"
        );
        Ok(added)
    }

    /// Subscribe a destination to every world of a datacenter
    pub async fn subscribe_all(
        &self,
        destination: DestinationId,
        datacenter: &str,
        category: Category,
        kinds: &[EventKind],
    ) -> TrackerResult<usize> {
        let mut added = 0;
        for world in worlds::worlds_in(datacenter)? {
            added += self.subscribe(destination, world, category, kinds).await?;
        }
        Ok(added)
    }

    /// Remove subscriptions; returns the number removed
    pub async fn unsubscribe(
        &self,
        destination: DestinationId,
        world: &str,
        category: Category,
        kinds: &[EventKind],
    ) -> TrackerResult<usize> {
        let world = worlds::normalize_world(world)?;
        let mut removed = 0;
        for kind in kinds {
            if self
                .store
                .delete(&Subscription::new(destination, world, category, *kind))
                .await?
            {
                removed += 1;
            }
        }
        info!(destination = %destination, world = %world, category = %category, count = removed, "Unsubscribed");
        Ok(removed)
    }

    pub async fn get_subscriptions(&self, destination: DestinationId) -> TrackerResult<Vec<Subscription>> {
        self.store.list_for_destination(destination).await
    }

    /// Drop every subscription, the metadata and ledger entries of a destination
    pub async fn clear_subscriptions(&self, destination: DestinationId) -> TrackerResult<usize> {
        let removed = self.store.delete_destination(destination).await?;
        self.ledger.purge_destination(destination).await;
        info!(destination = %destination, count = removed, "Cleared subscriptions");
        Ok(removed)
    }

    /// Mention prefixed to find notifications of a destination
    pub async fn set_notifier(&self, destination: DestinationId, mention: &str) -> TrackerResult<()> {
        let mention = mention.trim();
        if mention.is_empty() {
            return Err(TrackerError::Configuration("notifier must not be empty".to_string()));
        }
        self.store.set_notifier(destination, Some(mention.to_string())).await
    }

    pub async fn remove_notifier(&self, destination: DestinationId) -> TrackerResult<()> {
        self.store.set_notifier(destination, None).await
    }

    pub async fn meta(&self, destination: DestinationId) -> TrackerResult<DestinationMeta> {
        self.store.get_meta(destination).await
    }

    // ==================== Routing ====================

    /// Deliver an event to every subscription matching it
    ///
    /// Successful FIND deliveries are recorded in the ledger. Returns the
    /// number of deliveries.
    pub async fn route(&self, event: &RoutedEvent) -> usize {
        self.deliver(event, &[]).await.len()
    }

    /// Deliver to matching subscriptions outside `skip`; returns the
    /// destinations reached
    async fn deliver(&self, event: &RoutedEvent, skip: &[DestinationId]) -> Vec<DestinationId> {
        let subscriptions = match self
            .store
            .list_matching(&event.key.world, event.category, event.event_kind)
            .await
        {
            Ok(subs) => subs,
            Err(e) => {
                warn!(world = %event.key.world, error = %e, "Failed to load subscriptions");
                return Vec::new();
            }
        };

        let mut delivered = Vec::new();
        for sub in subscriptions {
            if skip.contains(&sub.destination) || delivered.contains(&sub.destination) {
                continue;
            }
            let mut notification = event.notification.clone();
            if event.event_kind == EventKind::Find {
                if let Some(notifier) = self.notifier(sub.destination).await {
                    notification.content = format!("{} {}", notifier, notification.content);
                }
            }

            if let Some(handle) = self.send(sub.destination, &notification).await {
                delivered.push(sub.destination);
                if event.event_kind == EventKind::Find {
                    self.ledger
                        .log(sub.destination, &event.key, handle, event.found_at)
                        .await;
                }
                self.bump(sub.destination, event.event_kind).await;
            }
        }

        debug!(
            world = %event.key.world,
            category = %event.category,
            event_kind = %event.event_kind,
            count = delivered.len(),
            "Event routed"
        );
        delivered
    }

    /// Route a find reported by a push source
    ///
    /// Destinations in `skip` already hold a find message for the key and
    /// are left alone. Returns the destinations reached.
    pub async fn route_find(
        &self,
        target: &TargetDefinition,
        key: &InstanceKey,
        category: Category,
        coords: Option<Coords>,
        found_at: DateTime<Utc>,
        skip: &[DestinationId],
    ) -> Vec<DestinationId> {
        let train = category == Category::Trains;
        let event = RoutedEvent {
            key: key.clone(),
            category,
            event_kind: EventKind::Find,
            notification: render::find(target, key, coords, train),
            found_at,
        };
        self.deliver(&event, skip).await
    }

    /// Route an authoritative status change
    ///
    /// Deaths first edit every find notification on record for the key;
    /// DEATH subscribers that had no such notification get a fresh one.
    pub async fn route_change(
        &self,
        target: &TargetDefinition,
        key: &InstanceKey,
        old: &AuthoritativeStatus,
        new: &AuthoritativeStatus,
        now: DateTime<Utc>,
    ) -> usize {
        let Some(category) = target.category() else {
            return 0;
        };

        let mut delivered = 0;
        let mut edited = Vec::new();
        if new.status == HuntStatus::Died && old.status != HuntStatus::Died {
            let died_at = new.last_death_at.unwrap_or(now);
            for destination in self.ledger.destinations_for(key).await {
                if let Some((handle, found_at)) = self.ledger.consume(destination, key).await {
                    let notification = render::death_edit(target, key, found_at, died_at);
                    if self.edit(destination, &handle, &notification).await {
                        delivered += 1;
                        self.bump(destination, EventKind::Death).await;
                    }
                    edited.push(destination);
                }
            }
        }

        for kind in [EventKind::Open, EventKind::Death] {
            let Some(rule) = first_matching_rule(kind, old.status, new.status) else {
                continue;
            };
            let subscriptions = match self.store.list_matching(&key.world, category, kind).await {
                Ok(subs) => subs,
                Err(e) => {
                    warn!(world = %key.world, error = %e, "Failed to load subscriptions");
                    continue;
                }
            };

            for sub in subscriptions {
                if edited.contains(&sub.destination) {
                    continue;
                }
                let notification = match rule.event_kind {
                    EventKind::Death => render::death(target, key, new.last_death_at.unwrap_or(now)),
                    _ => render::status_change(target, key, new),
                };
                if self.send(sub.destination, &notification).await.is_some() {
                    delivered += 1;
                    self.bump(sub.destination, rule.event_kind).await;
                }
            }
            debug!(
                world = %key.world,
                target = %target.name,
                rule = rule.name,
                "Change rule applied"
            );
        }

        delivered
    }

    /// Route fate progress, editing the running notification in place
    ///
    /// `progress` of `None` closes the notification.
    pub async fn route_fate(
        &self,
        target: &TargetDefinition,
        key: &InstanceKey,
        progress: Option<&FateProgress>,
        now: DateTime<Utc>,
    ) -> usize {
        let subscriptions = match self
            .store
            .list_matching(&key.world, Category::Fate, EventKind::Find)
            .await
        {
            Ok(subs) => subs,
            Err(e) => {
                warn!(world = %key.world, error = %e, "Failed to load subscriptions");
                return 0;
            }
        };

        let closing = progress.map_or(true, |p| p.is_complete());
        let mut delivered = 0;
        for sub in subscriptions {
            let destination = sub.destination;
            let existing = self.ledger.read(destination, key, closing).await;

            match (existing, progress) {
                (Some((handle, _)), Some(p)) if !closing => {
                    let notification = render::fate_progress(target, key, p);
                    if self.edit(destination, &handle, &notification).await {
                        delivered += 1;
                    }
                }
                (Some((handle, _)), _) => {
                    let notification = render::fate_closed(target, key, progress.is_some());
                    if self.edit(destination, &handle, &notification).await {
                        delivered += 1;
                    }
                }
                (None, Some(p)) if !closing => {
                    let mut notification = render::fate_progress(target, key, p);
                    if let Some(notifier) = self.notifier(destination).await {
                        notification.content = format!("{} {}", notifier, notification.content);
                    }
                    if let Some(handle) = self.send(destination, &notification).await {
                        self.ledger.log(destination, key, handle, now).await;
                        self.bump(destination, EventKind::Find).await;
                        delivered += 1;
                    }
                }
                (None, _) => {}
            }
        }
        delivered
    }

    // ==================== Delivery ====================

    async fn notifier(&self, destination: DestinationId) -> Option<String> {
        self.store
            .get_meta(destination)
            .await
            .ok()
            .and_then(|meta| meta.notifier)
    }

    async fn bump(&self, destination: DestinationId, kind: EventKind) {
        let (finds, deaths) = match kind {
            EventKind::Find => (1, 0),
            EventKind::Death => (0, 1),
            EventKind::Open => return,
        };
        if let Err(e) = self.store.increment_counters(destination, finds, deaths).await {
            debug!(destination = %destination, error = %e, "Failed to update counters");
        }
    }

    async fn send(&self, destination: DestinationId, notification: &Notification) -> Option<MessageHandle> {
        match self.sink.send(destination, notification).await {
            Ok(handle) => Some(handle),
            Err(e) => {
                self.handle_failure(destination, e).await;
                None
            }
        }
    }

    async fn edit(&self, destination: DestinationId, handle: &MessageHandle, notification: &Notification) -> bool {
        match self.sink.edit(destination, handle, notification).await {
            Ok(()) => true,
            Err(SinkError::NotFound) => {
                debug!(destination = %destination, message = %handle, "Notification deleted externally");
                false
            }
            Err(e) => {
                self.handle_failure(destination, e).await;
                false
            }
        }
    }

    async fn handle_failure(&self, destination: DestinationId, error: SinkError) {
        match error {
            SinkError::Unreachable => {
                warn!(destination = %destination, "Destination unreachable, purging subscriptions");
                if let Err(e) = self.store.delete_destination(destination).await {
                    warn!(destination = %destination, error = %e, "Failed to purge destination");
                }
                self.ledger.purge_destination(destination).await;
            }
            SinkError::Forbidden => {
                warn!(destination = %destination, "Destination forbidden, skipping delivery");
            }
            other => {
                warn!(destination = %destination, error = %other, "Delivery failed");
            }
        }
    }
}
