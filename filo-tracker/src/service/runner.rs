//! Background Runner
//!
//! Drives the periodic tasks of the tracker:
//! - status recheck
//! - fate expiry and ledger sweep
//! - tracked world refresh
//!
//! Every iteration runs under its own timeout. A timed out iteration is
//! logged and the loop carries on with the next tick.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::TrackerConfig;
use crate::tracker::HuntTracker;

/// Background runner
pub struct BackgroundRunner {
    tracker: Arc<HuntTracker>,
    config: TrackerConfig,
}

impl BackgroundRunner {
    pub fn new(tracker: Arc<HuntTracker>, config: TrackerConfig) -> Self {
        Self { tracker, config }
    }

    /// Spawn the runner loop
    pub async fn start(self) -> RunnerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);
        let running = Arc::new(RwLock::new(true));
        let running_clone = running.clone();

        let recheck_interval = Duration::from_secs(self.config.recheck_interval_secs.max(1));
        let sweep_interval = Duration::from_secs(self.config.fate_sweep_interval_secs.max(1));
        let refresh_interval = Duration::from_secs(self.config.world_refresh_interval_secs.max(1));
        let task_timeout = Duration::from_secs(self.config.task_timeout_secs.max(1));
        let tracker = self.tracker;

        tokio::spawn(async move {
            let mut recheck_timer = interval(recheck_interval);
            let mut sweep_timer = interval(sweep_interval);
            let mut refresh_timer = interval(refresh_interval);
            for timer in [&mut recheck_timer, &mut sweep_timer, &mut refresh_timer] {
                timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            }

            loop {
                tokio::select! {
                    _ = shutdown_rx.recv() => {
                        info!("Background runner received shutdown signal");
                        break;
                    }
                    _ = refresh_timer.tick() => {
                        if *running_clone.read().await {
                            run_task("world_refresh", task_timeout, async {
                                let added = tracker.refresh_worlds().await;
                                if added > 0 {
                                    info!(count = added, "New worlds tracked");
                                }
                            })
                            .await;
                        }
                    }
                    _ = recheck_timer.tick() => {
                        if *running_clone.read().await {
                            run_task("recheck", task_timeout, async {
                                let summary = tracker.recheck().await;
                                if summary.changes > 0 {
                                    info!(
                                        worlds = summary.worlds_checked,
                                        failed = summary.worlds_failed,
                                        changes = summary.changes,
                                        "Recheck routed status changes"
                                    );
                                }
                            })
                            .await;
                        }
                    }
                    _ = sweep_timer.tick() => {
                        if *running_clone.read().await {
                            run_task("sweep", task_timeout, async {
                                let summary = tracker.sweep().await;
                                debug!(
                                    fates = summary.fates_expired,
                                    ledger = summary.ledger_evicted,
                                    "Sweep complete"
                                );
                            })
                            .await;
                        }
                    }
                }
            }

            info!("Background runner stopped");
        });

        RunnerHandle {
            shutdown_tx,
            running,
        }
    }
}

/// Run one iteration under a timeout; a timeout cancels only this iteration
async fn run_task<F: Future<Output = ()>>(name: &'static str, limit: Duration, task: F) {
    if timeout(limit, task).await.is_err() {
        warn!(task = name, timeout_secs = limit.as_secs(), "Periodic task timed out");
    }
}

/// Runner handle
pub struct RunnerHandle {
    shutdown_tx: mpsc::Sender<()>,
    running: Arc<RwLock<bool>>,
}

impl RunnerHandle {
    /// Stop the runner
    pub async fn stop(self) {
        *self.running.write().await = false;
        let _ = self.shutdown_tx.send(()).await;
    }

    /// Skip ticks until resumed
    pub async fn pause(&self) {
        *self.running.write().await = false;
    }

    pub async fn resume(&self) {
        *self.running.write().await = true;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }
}
