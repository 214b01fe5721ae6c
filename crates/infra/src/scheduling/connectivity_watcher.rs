//! Connectivity watcher
//!
//! Polls a [`ConnectivityProbe`] and feeds every result into
//! [`OfflineSyncService::set_online`]. This is the fallback for hosts that
//! have no native online/offline events. An online edge awaits the drain it
//! triggers before the next poll, so a slow drain delays polling instead of
//! stacking up.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use carebridge_core::OfflineSyncService;
//! use carebridge_infra::http::HttpConnectivityProbe;
//! use carebridge_infra::scheduling::{ConnectivityWatcher, ConnectivityWatcherConfig};
//!
//! # async fn example(
//! #     service: Arc<OfflineSyncService>,
//! # ) -> Result<(), Box<dyn std::error::Error>> {
//! let probe = HttpConnectivityProbe::new(
//!     "https://crm.example.com/api",
//!     "/health",
//!     Duration::from_secs(5),
//! )?;
//! let mut watcher = ConnectivityWatcher::new(
//!     service,
//!     Arc::new(probe),
//!     ConnectivityWatcherConfig { poll_interval: Duration::from_secs(30), ..Default::default() },
//! );
//!
//! watcher.start()?;
//! // ... application runs ...
//! watcher.stop().await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use carebridge_core::{ConnectivityProbe, OfflineSyncService};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};

/// Configuration for the connectivity watcher.
#[derive(Debug, Clone)]
pub struct ConnectivityWatcherConfig {
    /// Interval between probes; the first probe runs immediately
    pub poll_interval: Duration,
    /// Join timeout when stopping
    pub join_timeout: Duration,
}

impl Default for ConnectivityWatcherConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_secs(30), join_timeout: Duration::from_secs(5) }
    }
}

/// Polling connectivity worker with explicit lifecycle management.
pub struct ConnectivityWatcher {
    service: Arc<OfflineSyncService>,
    probe: Arc<dyn ConnectivityProbe>,
    config: ConnectivityWatcherConfig,
    cancellation: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl ConnectivityWatcher {
    pub fn new(
        service: Arc<OfflineSyncService>,
        probe: Arc<dyn ConnectivityProbe>,
        config: ConnectivityWatcherConfig,
    ) -> Self {
        Self {
            service,
            probe,
            config,
            cancellation: CancellationToken::new(),
            task_handle: None,
        }
    }

    /// Spawn the polling task on the current Tokio runtime.
    ///
    /// # Errors
    /// Returns [`SchedulerError::AlreadyRunning`] if the task is active.
    #[instrument(skip(self))]
    pub fn start(&mut self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        self.cancellation = CancellationToken::new();

        let service = Arc::clone(&self.service);
        let probe = Arc::clone(&self.probe);
        let poll_interval = self.config.poll_interval;
        let cancel = self.cancellation.clone();

        let handle = tokio::spawn(async move {
            Self::poll_loop(service, probe, poll_interval, cancel).await;
        });

        self.task_handle = Some(handle);
        info!(poll_interval_ms = poll_interval.as_millis() as u64, "Connectivity watcher started");
        Ok(())
    }

    /// Stop the watcher and wait for the polling task to finish.
    ///
    /// # Errors
    /// Returns [`SchedulerError::NotRunning`] if the watcher was never
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
                warn!("Watcher task panicked: {}", e);
                return Err(SchedulerError::TaskJoinFailed(e.to_string()));
            }
            Err(_) => {
                warn!("Watcher task did not complete within timeout");
                return Err(SchedulerError::Timeout { millis: join_timeout.as_millis() as u64 });
            }
        }

        info!("Connectivity watcher stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.task_handle.is_some()
    }

    async fn poll_loop(
        service: Arc<OfflineSyncService>,
        probe: Arc<dyn ConnectivityProbe>,
        poll_interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Connectivity watcher loop cancelled");
                    break;
                }
                _ = ticker.tick() => {
                    let online = tokio::select! {
                        _ = cancel.cancelled() => break,
                        online = probe.check() => online,
                    };
                    if let Some(edge) = service.set_online(online).await {
                        info!(?edge, "Connectivity changed");
                    }
                }
            }
        }
    }
}

impl Drop for ConnectivityWatcher {
    fn drop(&mut self) {
        self.cancellation.cancel();
    }
}
