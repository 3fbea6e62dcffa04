//! JSON file subscription store
//!
//! The whole store is one JSON document, rewritten after every mutation.

use async_trait::async_trait;
use filo_core::{Category, DestinationId, EventKind, Subscription};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info};

use super::{DestinationMeta, StoreState, SubscriptionStore};
use crate::error::{TrackerError, TrackerResult};

/// File-backed store
#[derive(Debug)]
pub struct FileSubscriptionStore {
    path: PathBuf,
    state: RwLock<StoreState>,
}

impl FileSubscriptionStore {
    /// Open a store, starting empty when the file does not exist
    pub async fn open(path: impl AsRef<Path>) -> TrackerResult<Self> {
        let path = path.as_ref().to_path_buf();
        let state = match tokio::fs::read_to_string(&path).await {
            Ok(json) if json.trim().is_empty() => StoreState::default(),
            Ok(json) => serde_json::from_str(&json)
                .map_err(|e| TrackerError::Storage(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoreState::default(),
            Err(e) => return Err(e.into()),
        };
        info!(
            path = %path.display(),
            count = state.subscriptions.len(),
            "Subscription store opened"
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the store to a sibling temp file and swap it in
    async fn persist(&self, state: &StoreState) -> TrackerResult<()> {
        let json = serde_json::to_string_pretty(state)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), "Subscription store saved");
        Ok(())
    }
}

#[async_trait]
impl SubscriptionStore for FileSubscriptionStore {
    async fn insert(&self, subscription: &Subscription) -> TrackerResult<bool> {
        let mut state = self.state.write().await;
        let inserted = state.insert(subscription);
        if inserted {
            self.persist(&state).await?;
        }
        Ok(inserted)
    }

    async fn delete(&self, subscription: &Subscription) -> TrackerResult<bool> {
        let mut state = self.state.write().await;
        let deleted = state.delete(subscription);
        if deleted {
            self.persist(&state).await?;
        }
        Ok(deleted)
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
        let mut state = self.state.write().await;
        let removed = state.delete_destination(destination);
        self.persist(&state).await?;
        Ok(removed)
    }

    async fn get_meta(&self, destination: DestinationId) -> TrackerResult<DestinationMeta> {
        Ok(self.state.read().await.get_meta(destination))
    }

    async fn put_meta(&self, destination: DestinationId, meta: &DestinationMeta) -> TrackerResult<()> {
        let mut state = self.state.write().await;
        state.put_meta(destination, meta);
        self.persist(&state).await
    }

    async fn set_notifier(&self, destination: DestinationId, notifier: Option<String>) -> TrackerResult<()> {
        let mut state = self.state.write().await;
        state.set_notifier(destination, notifier);
        self.persist(&state).await
    }

    async fn increment_counters(
        &self,
        destination: DestinationId,
        finds: u64,
        deaths: u64,
    ) -> TrackerResult<DestinationMeta> {
        let mut state = self.state.write().await;
        let meta = state.increment_counters(destination, finds, deaths);
        self.persist(&state).await?;
        Ok(meta)
    }
}
