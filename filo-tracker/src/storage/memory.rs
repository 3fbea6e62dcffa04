//! In-memory subscription store, used for tests and development

use async_trait::async_trait;
use filo_core::{Category, DestinationId, EventKind, Subscription};
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{DestinationMeta, StoreState, SubscriptionStore};
use crate::error::TrackerResult;

/// Memory store
#[derive(Debug, Clone, Default)]
pub struct MemorySubscriptionStore {
    state: Arc<RwLock<StoreState>>,
}

impl MemorySubscriptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove everything
    pub async fn clear(&self) {
        *self.state.write().await = StoreState::default();
    }
}

#[async_trait]
impl SubscriptionStore for MemorySubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> TrackerResult<bool> {
        Ok(self.state.write().await.insert(subscription))
    }

    async fn delete(&self, subscription: &Subscription) -> TrackerResult<bool> {
        Ok(self.state.write().await.delete(subscription))
    }

    async fn list_for_destination(&self, destination: DestinationId) -> TrackerResult<Vec<Subscription>> {
        Ok(self.state.read().await.list_for_destination(destination))
    }

    async fn list_matching(
        &self,
        world: &str,
        category: Category,
        event_kind: EventKind,
    ) -> TrackerResult<Vec<Subscription>> {
        Ok(self.state.read().await.list_matching(world, category, event_kind))
    }

    async fn delete_destination(&self, destination: DestinationId) -> TrackerResult<usize> {
        Ok(self.state.write().await.delete_destination(destination))
    }

    async fn get_meta(&self, destination: DestinationId) -> TrackerResult<DestinationMeta> {
        Ok(self.state.read().await.get_meta(destination))
    }

    async fn put_meta(&self, destination: DestinationId, meta: &DestinationMeta) -> TrackerResult<()> {
        self.state.write().await.put_meta(destination, meta);
        Ok(())
    }

    async fn set_notifier(&self, destination: DestinationId, notifier: Option<String>) -> TrackerResult<()> {
        self.state.write().await.set_notifier(destination, notifier);
        Ok(())
    }

    async fn increment_counters(
        &self,
        destination: DestinationId,
        finds: u64,
        deaths: u64,
    ) -> TrackerResult<DestinationMeta> {
        Ok(self.state.write().await.increment_counters(destination, finds, deaths))
    }
}
