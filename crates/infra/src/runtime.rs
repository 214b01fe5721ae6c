//! Wiring from [`OfflineConfig`] to a running offline engine
//!
//! [`OfflineRuntimeBuilder`] opens the configured storage, builds the HTTP
//! execution sink and connectivity probe, starts the background workers and
//! initialises [`OfflineSyncService`]. Any collaborator can be overridden,
//! which is how tests and hosts with their own transport plug in.

use std::sync::Arc;

use carebridge_common::time::Clock;
use carebridge_core::{
    ConnectivityProbe, ExecutionSink, OfflineSyncDeps, OfflineSyncService, StatusSink,
    StorageBackend, SyncSettings,
};
use carebridge_domain::{CareBridgeError, OfflineConfig, Result, StatusEvent};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::http::{HttpConnectivityProbe, HttpExecutionSink};
use crate::scheduling::{
    BackgroundSyncScheduler, BackgroundSyncSchedulerConfig, ConnectivityWatcher,
    ConnectivityWatcherConfig,
};
use crate::status::{BroadcastStatusSink, FanoutStatusSink, TracingStatusSink};
use crate::storage;

const STATUS_CHANNEL_CAPACITY: usize = 64;

/// Builder for [`OfflineRuntime`]
pub struct OfflineRuntimeBuilder {
    config: OfflineConfig,
    storage: Option<Arc<dyn StorageBackend>>,
    executor: Option<Arc<dyn ExecutionSink>>,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    status_sinks: Vec<Arc<dyn StatusSink>>,
    clock: Option<Arc<dyn Clock>>,
}

impl OfflineRuntimeBuilder {
    pub fn new(config: OfflineConfig) -> Self {
        Self {
            config,
            storage: None,
            executor: None,
            probe: None,
            status_sinks: Vec::new(),
            clock: None,
        }
    }

    /// Use this backend instead of the one named in `storage.backend`
    #[must_use]
    pub fn storage(mut self, storage: Arc<dyn StorageBackend>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Use this executor instead of the HTTP sink for `remote.base_url`
    #[must_use]
    pub fn executor(mut self, executor: Arc<dyn ExecutionSink>) -> Self {
        self.executor = Some(executor);
        self
    }

    /// Use this probe instead of the HTTP health check
    #[must_use]
    pub fn probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    /// Also deliver status events to `sink`
    #[must_use]
    pub fn status_sink(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.status_sinks.push(sink);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Open storage, start the workers and initialise the service.
    ///
    /// Must be called inside a Tokio runtime. When a probe is available the
    /// initial connectivity state comes from one probe call, otherwise the
    /// engine starts online.
    ///
    /// # Errors
    /// Returns [`CareBridgeError::Config`] for invalid configuration or a
    /// missing transport, and [`CareBridgeError::Storage`] when the storage
    /// backend cannot be opened.
    #[instrument(skip(self), fields(backend = %self.config.storage.backend))]
    pub async fn start(self) -> Result<OfflineRuntime> {
        let config = self.config;
        config.validate()?;

        let storage = match self.storage {
            Some(storage) => storage,
            None => storage::open_backend(&config.storage)?,
        };

        let executor: Arc<dyn ExecutionSink> = match self.executor {
            Some(executor) => executor,
            None => Arc::new(HttpExecutionSink::from_config(&config.remote)?),
        };

        let probe: Option<Arc<dyn ConnectivityProbe>> = match (self.probe, &config.remote.base_url)
        {
            (Some(probe), _) => Some(probe),
            (None, Some(_)) => Some(Arc::new(HttpConnectivityProbe::from_config(&config.remote)?)),
            (None, None) => None,
        };

        let status = Arc::new(BroadcastStatusSink::new(STATUS_CHANNEL_CAPACITY));
        let mut fanout =
            FanoutStatusSink::new().with(Arc::new(TracingStatusSink)).with(status.clone());
        for sink in self.status_sinks {
            fanout = fanout.with(sink);
        }

        let mut scheduler =
            BackgroundSyncScheduler::new(BackgroundSyncSchedulerConfig::from(&config.sync));

        let mut deps = OfflineSyncDeps::new(storage, executor, Arc::new(fanout))
            .with_background_sync(Arc::new(scheduler.handle()));
        if let Some(probe) = &probe {
            deps = deps.with_probe(probe.clone());
        }
        if let Some(clock) = self.clock {
            deps = deps.with_clock(clock);
        }

        let initially_online = match &probe {
            Some(probe) => probe.check().await,
            None => true,
        };
        let settings = SyncSettings::from(&config.sync).initially_online(initially_online);
        let service = OfflineSyncService::init(deps, settings);

        scheduler.start(service.clone())?;

        let watcher = match probe {
            Some(probe) => {
                let mut watcher = ConnectivityWatcher::new(
                    service.clone(),
                    probe,
                    ConnectivityWatcherConfig {
                        poll_interval: config.sync.connectivity_poll_interval(),
                        ..ConnectivityWatcherConfig::default()
                    },
                );
                watcher.start()?;
                Some(watcher)
            }
            None => None,
        };

        info!(
            initially_online,
            pending = service.pending_action_count(),
            watching = watcher.is_some(),
            "offline runtime started"
        );

        Ok(OfflineRuntime { service, status, scheduler, watcher })
    }
}

/// A running offline engine and the workers that feed it
pub struct OfflineRuntime {
    service: Arc<OfflineSyncService>,
    status: Arc<BroadcastStatusSink>,
    scheduler: BackgroundSyncScheduler,
    watcher: Option<ConnectivityWatcher>,
}

impl OfflineRuntime {
    pub fn builder(config: OfflineConfig) -> OfflineRuntimeBuilder {
        OfflineRuntimeBuilder::new(config)
    }

    pub fn service(&self) -> &Arc<OfflineSyncService> {
        &self.service
    }

    /// Subscribe to status events (the toast feed)
    pub fn subscribe_status(&self) -> broadcast::Receiver<StatusEvent> {
        self.status.subscribe()
    }

    pub fn is_watching_connectivity(&self) -> bool {
        self.watcher.as_ref().is_some_and(ConnectivityWatcher::is_running)
    }

    /// Stop the workers, then flush the service.
    ///
    /// Worker stop failures are logged; the service is flushed regardless.
    #[instrument(skip(self))]
    pub async fn shutdown(mut self) -> Result<()> {
        let mut first_error: Option<CareBridgeError> = None;

        if let Some(watcher) = self.watcher.as_mut() {
            if let Err(err) = watcher.stop().await {
                warn!(error = %err, "connectivity watcher did not stop cleanly");
                first_error.get_or_insert(err.into());
            }
        }
        if let Err(err) = self.scheduler.stop().await {
            warn!(error = %err, "background sync scheduler did not stop cleanly");
            first_error.get_or_insert(err.into());
        }

        self.service.shutdown().await;
        info!("offline runtime stopped");

        first_error.map_or(Ok(()), Err)
    }
}
