//! Notification Ledger
//!
//! Remembers, per destination and instance key, the find notification
//! that was delivered so a later death or expiry can edit it in place.
//! There is at most one entry per (destination, key).

use chrono::{DateTime, Duration, Utc};
use filo_core::{DestinationId, InstanceKey, MessageHandle};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};

/// One delivered find notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationEntry {
    pub destination: DestinationId,
    pub key: InstanceKey,
    pub handle: MessageHandle,
    pub found_at: DateTime<Utc>,
}

/// Per destination × instance key notification log
#[derive(Debug, Default)]
pub struct NotificationLedger {
    entries: RwLock<HashMap<(DestinationId, InstanceKey), NotificationEntry>>,
}

impl NotificationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a delivered notification, replacing any previous entry
    pub async fn log(
        &self,
        destination: DestinationId,
        key: &InstanceKey,
        handle: MessageHandle,
        found_at: DateTime<Utc>,
    ) {
        let entry = NotificationEntry {
            destination,
            key: key.clone(),
            handle,
            found_at,
        };
        if let Some(previous) = self
            .entries
            .write()
            .await
            .insert((destination, key.clone()), entry)
        {
            debug!(
                destination = %destination,
                key = %key,
                message = %previous.handle,
                "Replaced ledger entry"
            );
        }
    }

    /// Read an entry, removing it when `delete` is set
    pub async fn read(
        &self,
        destination: DestinationId,
        key: &InstanceKey,
        delete: bool,
    ) -> Option<(MessageHandle, DateTime<Utc>)> {
        let lookup = (destination, key.clone());
        let entry = if delete {
            self.entries.write().await.remove(&lookup)
        } else {
            self.entries.read().await.get(&lookup).cloned()
        };
        entry.map(|e| (e.handle, e.found_at))
    }

    /// Read and delete an entry
    pub async fn consume(
        &self,
        destination: DestinationId,
        key: &InstanceKey,
    ) -> Option<(MessageHandle, DateTime<Utc>)> {
        self.read(destination, key, true).await
    }

    /// Destinations holding an entry for `key`
    pub async fn destinations_for(&self, key: &InstanceKey) -> Vec<DestinationId> {
        let mut destinations: Vec<DestinationId> = self
            .entries
            .read()
            .await
            .keys()
            .filter(|(_, k)| k == key)
            .map(|(d, _)| *d)
            .collect();
        destinations.sort();
        destinations
    }

    /// Drop every entry of a destination
    pub async fn purge_destination(&self, destination: DestinationId) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|(d, _), _| *d != destination);
        before - entries.len()
    }

    /// Drop entries older than `max_age`
    ///
    /// Entries whose close event never arrives (message deleted
    /// externally, target never reported dead) would otherwise stay forever.
    pub async fn evict_stale(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| now - e.found_at <= max_age);
        let evicted = before - entries.len();
        if evicted > 0 {
            info!(count = evicted, "Evicted stale ledger entries");
        }
        evicted
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
