//! Deferred background sync
//!
//! [`BackgroundSyncScheduler`] stands in for a platform background-sync
//! facility. The engine registers a tag through a [`BackgroundSyncHandle`];
//! once the configured delay has passed the worker runs one
//! `process_pending_actions()` for it. Registering a tag that is already
//! waiting does not schedule a second run. A registration carrying a remote
//! wait (`register_after`) runs no earlier than that wait, and pushes back a
//! tag that is already waiting.
//!
//! The handle is created before the service (it is one of the service's
//! dependencies) and the worker is started once the service exists:
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use carebridge_core::{MemoryStorage, OfflineSyncDeps, OfflineSyncService, SyncSettings};
//! use carebridge_infra::scheduling::{BackgroundSyncScheduler, BackgroundSyncSchedulerConfig};
//! use carebridge_infra::status::TracingStatusSink;
//!
//! # async fn example(
//! #     executor: Arc<dyn carebridge_core::ExecutionSink>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let mut scheduler = BackgroundSyncScheduler::new(BackgroundSyncSchedulerConfig::default());
//! let deps =
//!     OfflineSyncDeps::new(Arc::new(MemoryStorage::new()), executor, Arc::new(TracingStatusSink))
//!         .with_background_sync(Arc::new(scheduler.handle()));
//! let service = OfflineSyncService::init(deps, SyncSettings::default());
//!
//! scheduler.start(service.clone())?;
//! // ... application runs ...
//! scheduler.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use carebridge_core::{BackgroundSyncError, BackgroundSyncRegistrar, OfflineSyncService};
use carebridge_domain::constants::DEFAULT_BACKGROUND_SYNC_DELAY_SECS;
use carebridge_domain::SyncConfig;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Configuration for the background sync scheduler.
#[derive(Debug, Clone)]
pub struct BackgroundSyncSchedulerConfig {
    /// Time between a registration and the sync it triggers
    pub delay: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for BackgroundSyncSchedulerConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(DEFAULT_BACKGROUND_SYNC_DELAY_SECS),
            join_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&SyncConfig> for BackgroundSyncSchedulerConfig {
    fn from(config: &SyncConfig) -> Self {
        Self { delay: config.background_sync_delay(), ..Self::default() }
    }
}

#[derive(Debug)]
struct Registration {
    tag: String,
    min_delay: Option<Duration>,
}

/// Registrar half handed to the engine
#[derive(Debug, Clone)]
pub struct BackgroundSyncHandle {
    sender: mpsc::UnboundedSender<Registration>,
}

impl BackgroundSyncHandle {
    fn send(&self, tag: &str, min_delay: Option<Duration>) -> Result<(), BackgroundSyncError> {
        self.sender
            .send(Registration { tag: tag.to_string(), min_delay })
            .map_err(|_| BackgroundSyncError::Registration("scheduler has shut down".into()))
    }
}

#[async_trait]
impl BackgroundSyncRegistrar for BackgroundSyncHandle {
    async fn register(&self, tag: &str) -> Result<(), BackgroundSyncError> {
        self.send(tag, None)
    }

    async fn register_after(
        &self,
        tag: &str,
        min_delay: Duration,
    ) -> Result<(), BackgroundSyncError> {
        self.send(tag, Some(min_delay))
    }
}

/// Registrar for hosts without any background facility
#[derive(Debug, Default, Clone, Copy)]
pub struct UnsupportedBackgroundSync;

#[async_trait]
impl BackgroundSyncRegistrar for UnsupportedBackgroundSync {
    async fn register(&self, _tag: &str) -> Result<(), BackgroundSyncError> {
        Err(BackgroundSyncError::Unsupported)
    }
}

/// Worker that turns tag registrations into delayed sync runs
pub struct BackgroundSyncScheduler {
    sender: mpsc::UnboundedSender<Registration>,
    // Parked here while the worker is stopped so a restart keeps the inbox
    receiver: Arc<Mutex<Option<mpsc::UnboundedReceiver<Registration>>>>,
    config: BackgroundSyncSchedulerConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
    fired: Arc<AtomicU64>,
}

impl BackgroundSyncScheduler {
    pub fn new(config: BackgroundSyncSchedulerConfig) -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(Some(receiver))),
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
            fired: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Registrar to pass into `OfflineSyncDeps::with_background_sync`
    pub fn handle(&self) -> BackgroundSyncHandle {
        BackgroundSyncHandle { sender: self.sender.clone() }
    }

    /// Number of sync runs triggered so far
    pub fn fired_count(&self) -> u64 {
        self.fired.load(Ordering::Acquire)
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    /// Spawn the worker on the current Tokio runtime.
    ///
    /// # Errors
    /// Returns [`SchedulerError::AlreadyRunning`] if the worker is active, or
    /// [`SchedulerError::ChannelClosed`] if a previous run lost the inbox.
    #[instrument(skip(self, service))]
    pub fn start(&mut self, service: Arc<OfflineSyncService>) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        let receiver = self.receiver.lock().take().ok_or(SchedulerError::ChannelClosed)?;

        self.cancellation = CancellationToken::new();

        let parking = Arc::clone(&self.receiver);
        let delay = self.config.delay;
        let cancel = self.cancellation.clone();
        let fired = Arc::clone(&self.fired);

        let handle = tokio::spawn(async move {
            let receiver = Self::run_loop(service, receiver, delay, cancel, fired).await;
            *parking.lock() = Some(receiver);
        });

        self.task_handle = Some(handle);
        info!(delay_ms = delay.as_millis() as u64, "Background sync scheduler started");
        Ok(())
    }

    /// Stop the worker; tags still waiting are dropped.
    ///
    /// # Errors
    /// Returns [`SchedulerError::NotRunning`] if the worker was never
    /// started, or a join error if the task panicked or did not finish in
    /// time.
    #[instrument(skip(self))]
    pub async fn stop(&mut self) -> SchedulerResult<()> {
        let Some(handle) = self.task_handle.take() else {
            return Err(SchedulerError::NotRunning);
        };

        self.cancellation.cancel();

        let join_timeout = self.config.join_timeout;
        match tokio::time::timeout(join_timeout, handle).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!("Scheduler task panicked: {}", e);
                return Err(SchedulerError::TaskJoinFailed(e.to_string()));
            }
            Err(_) => {
                warn!("Scheduler task did not complete within timeout");
                return Err(SchedulerError::Timeout { millis: join_timeout.as_millis() as u64 });
            }
        }

        info!("Background sync scheduler stopped");
        Ok(())
    }

    async fn run_loop(
        service: Arc<OfflineSyncService>,
        mut receiver: mpsc::UnboundedReceiver<Registration>,
        delay: Duration,
        cancel: CancellationToken,
        fired: Arc<AtomicU64>,
    ) -> mpsc::UnboundedReceiver<Registration> {
        let mut waiting: HashMap<String, Instant> = HashMap::new();

        loop {
            let next_due = waiting.values().min().copied();

            tokio::select! {
                _ = cancel.cancelled() => {
                    if !waiting.is_empty() {
                        debug!(dropped = waiting.len(), "Scheduler cancelled with tags waiting");
                    }
                    break;
                }
                Some(Registration { tag, min_delay }) = receiver.recv() => {
                    let due = Instant::now() + min_delay.map_or(delay, |wait| wait.max(delay));
                    match waiting.get_mut(&tag) {
                        Some(at) if min_delay.is_some() && due > *at => {
                            debug!(%tag, ?min_delay, "Background sync pushed back");
                            *at = due;
                        }
                        Some(_) => debug!(%tag, "Background sync already registered"),
                        None => {
                            debug!(%tag, ?min_delay, "Background sync registered");
                            waiting.insert(tag, due);
                        }
                    }
                }
                _ = sleep_until_due(next_due) => {
                    let now = Instant::now();
                    let due: Vec<String> = waiting
                        .iter()
                        .filter(|(_, at)| **at <= now)
                        .map(|(tag, _)| tag.clone())
                        .collect();

                    for tag in due {
                        waiting.remove(&tag);
                        fired.fetch_add(1, Ordering::AcqRel);
                        let outcome = service.process_pending_actions().await;
                        info!(%tag, ?outcome, "Background sync ran");
                    }
                }
            }
        }

        receiver
    }
}

async fn sleep_until_due(next_due: Option<Instant>) {
    match next_due {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

impl Drop for BackgroundSyncScheduler {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}

#[cfg(test)]
mod tests {
    use carebridge_common::testing::poll_until;
    use carebridge_core::offline::errors::ExecutionError;
    use carebridge_core::testing::{RecordingStatusSink, ScriptedExecutionSink};
    use carebridge_core::{MemoryStorage, OfflineSyncDeps, SyncSettings};
    use serde_json::json;

    use super::*;

    fn config(delay_ms: u64) -> BackgroundSyncSchedulerConfig {
        BackgroundSyncSchedulerConfig {
            delay: Duration::from_millis(delay_ms),
            join_timeout: Duration::from_secs(1),
        }
    }

    fn service_with(
        scheduler: &BackgroundSyncScheduler,
        executor: Arc<ScriptedExecutionSink>,
    ) -> Arc<OfflineSyncService> {
        let deps = OfflineSyncDeps::new(
            Arc::new(MemoryStorage::new()),
            executor,
            Arc::new(RecordingStatusSink::new()),
        )
        .with_background_sync(Arc::new(scheduler.handle()));
        OfflineSyncService::init(deps, SyncSettings::default())
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn duplicate_registrations_coalesce() {
        let mut scheduler = BackgroundSyncScheduler::new(config(50));
        let service = service_with(&scheduler, Arc::new(ScriptedExecutionSink::new()));
        scheduler.start(service).unwrap();

        let handle = scheduler.handle();
        handle.register("carebridge-offline-sync").await.unwrap();
        handle.register("carebridge-offline-sync").await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(scheduler.fired_count(), 1);
        scheduler.stop().await.unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn failed_drain_is_retried_after_delay() {
        let executor = Arc::new(
            ScriptedExecutionSink::new()
                .with_outcomes([Err(ExecutionError::Network("connection reset".into()))]),
        );
        let mut scheduler = BackgroundSyncScheduler::new(config(30));
        let service = service_with(&scheduler, executor.clone());
        scheduler.start(service.clone()).unwrap();

        service.queue_action("createDeal", json!({ "amount": 1200 }));

        let watched = service.clone();
        let drained = poll_until(Duration::from_secs(2), Duration::from_millis(10), || {
            let service = watched.clone();
            async move { service.pending_action_count() == 0 }
        })
        .await;

        scheduler.stop().await.unwrap();
        assert!(drained);
        assert_eq!(executor.attempt_count().await, 2);
        assert!(scheduler.fired_count() >= 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_wait_outlasts_the_configured_delay() {
        let mut scheduler = BackgroundSyncScheduler::new(config(10));
        let service = service_with(&scheduler, Arc::new(ScriptedExecutionSink::new()));
        scheduler.start(service).unwrap();

        let handle = scheduler.handle();
        handle.register_after("carebridge-offline-sync", Duration::from_millis(400)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(scheduler.fired_count(), 0);

        let fired = poll_until(Duration::from_secs(2), Duration::from_millis(10), || {
            let count = scheduler.fired_count();
            async move { count == 1 }
        })
        .await;
        scheduler.stop().await.unwrap();
        assert!(fired);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn remote_wait_pushes_back_a_waiting_tag() {
        let mut scheduler = BackgroundSyncScheduler::new(config(100));
        let service = service_with(&scheduler, Arc::new(ScriptedExecutionSink::new()));
        scheduler.start(service).unwrap();

        let handle = scheduler.handle();
        handle.register("carebridge-offline-sync").await.unwrap();
        handle.register_after("carebridge-offline-sync", Duration::from_millis(500)).await.unwrap();

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert_eq!(scheduler.fired_count(), 0);

        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(scheduler.fired_count(), 1);
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn restart_keeps_the_inbox() {
        let mut scheduler = BackgroundSyncScheduler::new(config(10));
        let service = service_with(&scheduler, Arc::new(ScriptedExecutionSink::new()));

        scheduler.start(service.clone()).unwrap();
        assert!(matches!(scheduler.start(service.clone()), Err(SchedulerError::AlreadyRunning)));
        scheduler.stop().await.unwrap();
        assert!(matches!(scheduler.stop().await, Err(SchedulerError::NotRunning)));

        scheduler.start(service).unwrap();
        scheduler.stop().await.unwrap();
    }

    #[tokio::test]
    async fn handle_fails_once_scheduler_is_gone() {
        let scheduler = BackgroundSyncScheduler::new(config(10));
        let handle = scheduler.handle();
        drop(scheduler);

        let err = handle.register("carebridge-offline-sync").await.unwrap_err();
        assert!(matches!(err, BackgroundSyncError::Registration(_)));
    }

    #[tokio::test]
    async fn unsupported_registrar_reports_unsupported() {
        let err = UnsupportedBackgroundSync.register("carebridge-offline-sync").await.unwrap_err();
        assert!(matches!(err, BackgroundSyncError::Unsupported));
    }
}
