//! Subscription persistence
//!
//! The router only ever issues exact-key operations: insert / delete of
//! one subscription, select by destination, select by
//! (world, category, event kind), and per-destination metadata.

pub mod file;
pub mod memory;

pub use file::FileSubscriptionStore;
pub use memory::MemorySubscriptionStore;

use async_trait::async_trait;
use filo_core::{Category, DestinationId, EventKind, Subscription};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::error::TrackerResult;

/// Per-destination metadata
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DestinationMeta {
    /// Mention prefixed to find notifications
    #[serde(default)]
    pub notifier: Option<String>,
    /// Finds delivered
    #[serde(default)]
    pub finds: u64,
    /// Deaths delivered
    #[serde(default)]
    pub deaths: u64,
}

/// Subscription store interface
#[async_trait]
pub trait SubscriptionStore: Send + Sync {
    // ==================== Subscriptions ====================

    /// Insert a subscription; `false` when it already existed
    async fn insert(&self, subscription: &Subscription) -> TrackerResult<bool>;

    /// Delete a subscription; `false` when it did not exist
    async fn delete(&self, subscription: &Subscription) -> TrackerResult<bool>;

    /// Subscriptions of one destination
    async fn list_for_destination(&self, destination: DestinationId) -> TrackerResult<Vec<Subscription>>;

    /// Subscriptions for an exact (world, category, event kind)
    async fn list_matching(
        &self,
        world: &str,
        category: Category,
        event_kind: EventKind,
    ) -> TrackerResult<Vec<Subscription>>;

    /// Delete every subscription and the metadata of a destination
    async fn delete_destination(&self, destination: DestinationId) -> TrackerResult<usize>;

    // ==================== Metadata ====================

    async fn get_meta(&self, destination: DestinationId) -> TrackerResult<DestinationMeta>;

    async fn put_meta(&self, destination: DestinationId, meta: &DestinationMeta) -> TrackerResult<()>;

    /// Replace the notifier, leaving the counters untouched
    async fn set_notifier(&self, destination: DestinationId, notifier: Option<String>) -> TrackerResult<()>;

    /// Add to the delivery counters in one step; returns the updated metadata
    async fn increment_counters(
        &self,
        destination: DestinationId,
        finds: u64,
        deaths: u64,
    ) -> TrackerResult<DestinationMeta>;
}

/// Store contents shared by the memory and file stores
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct StoreState {
    #[serde(default)]
    subscriptions: BTreeSet<Subscription>,
    #[serde(default)]
    destinations: HashMap<DestinationId, DestinationMeta>,
}

impl StoreState {
    fn insert(&mut self, subscription: &Subscription) -> bool {
        self.subscriptions.insert(subscription.clone())
    }

    fn delete(&mut self, subscription: &Subscription) -> bool {
        self.subscriptions.remove(subscription)
    }

    fn list_for_destination(&self, destination: DestinationId) -> Vec<Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| s.destination == destination)
            .cloned()
            .collect()
    }

    fn list_matching(&self, world: &str, category: Category, event_kind: EventKind) -> Vec<Subscription> {
        self.subscriptions
            .iter()
            .filter(|s| s.matches(world, category, event_kind))
            .cloned()
            .collect()
    }

    fn delete_destination(&mut self, destination: DestinationId) -> usize {
        let before = self.subscriptions.len();
        self.subscriptions.retain(|s| s.destination != destination);
        self.destinations.remove(&destination);
        before - self.subscriptions.len()
    }

    fn get_meta(&self, destination: DestinationId) -> DestinationMeta {
        self.destinations.get(&destination).cloned().unwrap_or_default()
    }

    fn put_meta(&mut self, destination: DestinationId, meta: &DestinationMeta) {
        self.destinations.insert(destination, meta.clone());
    }

    fn set_notifier(&mut self, destination: DestinationId, notifier: Option<String>) {
        self.destinations.entry(destination).or_default().notifier = notifier;
    }

    fn increment_counters(&mut self, destination: DestinationId, finds: u64, deaths: u64) -> DestinationMeta {
        let meta = self.destinations.entry(destination).or_default();
        meta.finds = meta.finds.saturating_add(finds);
        meta.deaths = meta.deaths.saturating_add(deaths);
        meta.clone()
    }
}
