//! Filo Service Builder

use filo_core::{Catalogue, Clock, SystemClock};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::TrackerConfig;
use crate::error::TrackerResult;
use crate::ingest::AdapterRegistry;
use crate::ledger::NotificationLedger;
use crate::router::SubscriptionRouter;
use crate::sink::{DestinationSink, LogSink, WebhookSink};
use crate::storage::{FileSubscriptionStore, MemorySubscriptionStore, SubscriptionStore};
use crate::timer_source::{CachedTimerSource, HttpRegionFetcher, RegionFetcher};
use crate::tracker::HuntTracker;
use crate::train::TrainRegistry;

use super::{FiloService, ServiceStatus};

/// Filo Service Builder
///
/// Every collaborator not set explicitly is built from the configuration.
#[derive(Default)]
pub struct FiloServiceBuilder {
    config: Option<TrackerConfig>,
    catalogue: Option<Arc<Catalogue>>,
    clock: Option<Arc<dyn Clock>>,
    fetcher: Option<Arc<dyn RegionFetcher>>,
    store: Option<Arc<dyn SubscriptionStore>>,
    sink: Option<Arc<dyn DestinationSink>>,
}

impl FiloServiceBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: TrackerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn catalogue(mut self, catalogue: Arc<Catalogue>) -> Self {
        self.catalogue = Some(catalogue);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Timer service fetcher; HTTP against the configured endpoint by default
    pub fn fetcher(mut self, fetcher: Arc<dyn RegionFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Subscription store; file or memory per configuration by default
    pub fn store(mut self, store: Arc<dyn SubscriptionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Destination sink; webhooks or log-only per configuration by default
    pub fn sink(mut self, sink: Arc<dyn DestinationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Build the service
    ///
    /// Fails when the catalogue cannot be loaded.
    pub async fn build(self) -> TrackerResult<FiloService> {
        let config = self.config.unwrap_or_default();

        let catalogue = match self.catalogue {
            Some(catalogue) => catalogue,
            None => Arc::new(match &config.catalogue_path {
                Some(path) => Catalogue::load(path)?,
                None => Catalogue::builtin()?,
            }),
        };

        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));

        let fetcher: Arc<dyn RegionFetcher> = match self.fetcher {
            Some(fetcher) => fetcher,
            None => Arc::new(HttpRegionFetcher::new(
                config.timer_endpoint.clone(),
                config.timer_timeout_secs,
            )?),
        };

        let store: Arc<dyn SubscriptionStore> = match (self.store, &config.subscriptions_path) {
            (Some(store), _) => store,
            (None, Some(path)) => Arc::new(FileSubscriptionStore::open(path).await?),
            (None, None) => Arc::new(MemorySubscriptionStore::new()),
        };

        let sink: Arc<dyn DestinationSink> = match (self.sink, &config.webhooks_path) {
            (Some(sink), _) => sink,
            (None, Some(path)) => Arc::new(WebhookSink::load(path, config.timer_timeout_secs).await?),
            (None, None) => {
                info!("No webhook table configured, notifications are only logged");
                Arc::new(LogSink::new())
            }
        };

        let timers = Arc::new(CachedTimerSource::new(
            fetcher,
            catalogue.clone(),
            clock.clone(),
            config.regions.clone(),
            config.timer_ttl_secs,
        ));
        let router = Arc::new(SubscriptionRouter::new(
            store,
            Arc::new(NotificationLedger::new()),
            sink.clone(),
        ));
        let trains = Arc::new(TrainRegistry::new(catalogue.clone(), sink, clock.clone()));
        let adapters = Arc::new(AdapterRegistry::from_config(
            &config.ingest,
            catalogue.clone(),
            clock.clone(),
        ));
        let tracker = Arc::new(HuntTracker::new(
            catalogue.clone(),
            timers,
            router,
            trains,
            clock,
            config.clone(),
        ));

        info!(
            targets = catalogue.len(),
            regions = config.regions.len(),
            sources = adapters.sources().len(),
            "Filo service built"
        );

        Ok(FiloService {
            config,
            catalogue,
            tracker,
            adapters,
            status: Arc::new(RwLock::new(ServiceStatus::Initializing)),
            runner_handle: Arc::new(RwLock::new(None)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::MockSink;
    use crate::timer_source::StaticRegionFetcher;

    #[tokio::test]
    async fn test_builder_defaults() {
        let service = FiloServiceBuilder::new()
            .config(TrackerConfig::development())
            .fetcher(Arc::new(StaticRegionFetcher::new()))
            .sink(Arc::new(MockSink::new()))
            .build()
            .await
            .unwrap();

        assert_eq!(service.status().await, ServiceStatus::Initializing);
        assert!(!service.catalogue().is_empty());
        assert_eq!(service.config().regions, vec!["Crystal".to_string()]);
    }

    #[tokio::test]
    async fn test_builder_fails_on_bad_catalogue() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalogue.json");
        std::fs::write(&path, "not json").unwrap();

        let config = TrackerConfig {
            catalogue_path: Some(path),
            ..TrackerConfig::development()
        };
        assert!(FiloServiceBuilder::new().config(config).build().await.is_err());
    }

    #[tokio::test]
    async fn test_builder_uses_subscription_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrackerConfig {
            subscriptions_path: Some(dir.path().join("subscriptions.json")),
            ..TrackerConfig::development()
        };
        let service = FiloServiceBuilder::new()
            .config(config)
            .fetcher(Arc::new(StaticRegionFetcher::new()))
            .build()
            .await
            .unwrap();

        service
            .tracker()
            .router()
            .subscribe(filo_core::DestinationId(3), "Mateus", filo_core::Category::SbS, &[filo_core::EventKind::Open])
            .await
            .unwrap();
        assert!(dir.path().join("subscriptions.json").exists());
    }
}
