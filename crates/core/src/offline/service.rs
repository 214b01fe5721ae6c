//! Offline sync service - the application's single handle on the engine
//!
//! Constructed once at process start with [`OfflineSyncService::init`] and
//! shared as an `Arc`. Public operations never surface storage, execution or
//! background-sync failures to the caller; those end in a log line or a
//! status event.

use std::sync::Arc;
use std::time::Duration;

use carebridge_common::time::{Clock, SystemClock};
use carebridge_domain::constants::DEFAULT_BACKGROUND_SYNC_TAG;
use carebridge_domain::{
    ConnectivityEdge, CrmAction, DrainOutcome, PendingAction, SyncConfig, SyncState,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::runtime::Handle;
use tracing::{debug, info, instrument, warn};

use super::background::BackgroundSyncBridge;
use super::cache::OfflineCache;
use super::connectivity::ConnectivityMonitor;
use super::notices;
use super::ports::{
    BackgroundSyncRegistrar, ConnectivityProbe, ExecutionSink, StatusSink, StorageBackend,
};
use super::queue::ActionQueue;
use super::reconciler::{RetryPolicy, SyncReconciler};
use super::store::DurableStore;

const SHUTDOWN_DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// External collaborators the service is wired to
pub struct OfflineSyncDeps {
    pub storage: Arc<dyn StorageBackend>,
    pub executor: Arc<dyn ExecutionSink>,
    pub status: Arc<dyn StatusSink>,
    pub probe: Option<Arc<dyn ConnectivityProbe>>,
    pub background: Option<Arc<dyn BackgroundSyncRegistrar>>,
    pub clock: Arc<dyn Clock>,
}

impl OfflineSyncDeps {
    pub fn new(
        storage: Arc<dyn StorageBackend>,
        executor: Arc<dyn ExecutionSink>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            storage,
            executor,
            status,
            probe: None,
            background: None,
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = Some(probe);
        self
    }

    pub fn with_background_sync(mut self, registrar: Arc<dyn BackgroundSyncRegistrar>) -> Self {
        self.background = Some(registrar);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

/// Policy knobs for the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSettings {
    pub retry: RetryPolicy,
    pub background_sync_tag: String,
    /// Connectivity assumed until the platform reports otherwise
    pub initially_online: bool,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            retry: RetryPolicy::default(),
            background_sync_tag: DEFAULT_BACKGROUND_SYNC_TAG.to_string(),
            initially_online: true,
        }
    }
}

impl From<&SyncConfig> for SyncSettings {
    fn from(config: &SyncConfig) -> Self {
        Self {
            retry: RetryPolicy::from(config),
            background_sync_tag: config.background_sync_tag.clone(),
            initially_online: true,
        }
    }
}

impl SyncSettings {
    pub fn initially_online(mut self, online: bool) -> Self {
        self.initially_online = online;
        self
    }
}

/// One drain pass plus the follow-up background registration
///
/// Cloneable so a pass can be spawned without borrowing the service.
#[derive(Clone)]
struct Drainer {
    reconciler: Arc<SyncReconciler>,
    queue: Arc<ActionQueue>,
    bridge: Arc<BackgroundSyncBridge>,
}

impl Drainer {
    async fn run(&self) -> DrainOutcome {
        let outcome = self.reconciler.drain().await;
        if let Some(report) = outcome.report() {
            if !self.queue.is_empty() {
                self.bridge.register_after(report.retry_after()).await;
            }
        }
        outcome
    }

    fn spawn(&self) {
        match Handle::try_current() {
            Ok(handle) => {
                let drainer = self.clone();
                handle.spawn(async move {
                    drainer.run().await;
                });
            }
            Err(_) => {
                warn!("No Tokio runtime available; pending actions will sync on the next drain");
            }
        }
    }
}

pub struct OfflineSyncService {
    store: Arc<DurableStore>,
    cache: OfflineCache,
    queue: Arc<ActionQueue>,
    connectivity: Arc<ConnectivityMonitor>,
    reconciler: Arc<SyncReconciler>,
    bridge: Arc<BackgroundSyncBridge>,
    status: Arc<dyn StatusSink>,
    probe: Option<Arc<dyn ConnectivityProbe>>,
    drainer: Drainer,
}

impl OfflineSyncService {
    /// Load persisted state once and wire the engine together
    ///
    /// When online with actions left over from a previous session, a drain is
    /// spawned on the current runtime.
    #[instrument(skip(deps, settings), fields(tag = %settings.background_sync_tag))]
    pub fn init(deps: OfflineSyncDeps, settings: SyncSettings) -> Arc<Self> {
        let store = Arc::new(DurableStore::new(deps.storage));
        let snapshot = store.load();

        let cache = OfflineCache::new(store.clone(), snapshot.offline_data);
        let queue = Arc::new(ActionQueue::new(
            store.clone(),
            deps.clock.clone(),
            snapshot.pending_actions,
            snapshot.dead_letter_actions,
        ));
        let connectivity = Arc::new(ConnectivityMonitor::new(settings.initially_online));
        let reconciler = Arc::new(SyncReconciler::new(
            queue.clone(),
            connectivity.clone(),
            deps.executor,
            deps.status.clone(),
            store.clone(),
            deps.clock,
            settings.retry,
            snapshot.last_sync_timestamp,
        ));
        let bridge =
            Arc::new(BackgroundSyncBridge::new(deps.background, settings.background_sync_tag));
        let drainer = Drainer {
            reconciler: reconciler.clone(),
            queue: queue.clone(),
            bridge: bridge.clone(),
        };

        let service = Arc::new(Self {
            store,
            cache,
            queue,
            connectivity,
            reconciler,
            bridge,
            status: deps.status,
            probe: deps.probe,
            drainer,
        });

        info!(
            pending_actions = service.queue.len(),
            dead_letters = service.queue.dead_letter_count(),
            cached_keys = service.cache.len(),
            online = service.is_online(),
            "Offline sync service initialised"
        );

        if service.is_online() && !service.queue.is_empty() {
            service.drainer.spawn();
        }

        service
    }

    /// Stop accepting drains, wait for an in-flight pass, write every section
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.reconciler.close();

        if tokio::time::timeout(SHUTDOWN_DRAIN_TIMEOUT, self.reconciler.wait_idle()).await.is_err()
        {
            warn!(
                timeout_secs = SHUTDOWN_DRAIN_TIMEOUT.as_secs(),
                "Drain still in flight at shutdown; persisting current state"
            );
        }

        let queue = self.queue.flush();
        let cache = self.cache.flush();
        let last_sync = self.reconciler.flush();
        info!(persisted = queue && cache && last_sync, "Offline sync service shut down");
    }

    // ---------------------------------------------------------------------
    // Observers
    // ---------------------------------------------------------------------

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn is_syncing(&self) -> bool {
        self.reconciler.is_draining()
    }

    pub fn pending_action_count(&self) -> usize {
        self.queue.len()
    }

    pub fn pending_actions(&self) -> Vec<PendingAction> {
        self.queue.snapshot_for_drain()
    }

    pub fn last_sync_timestamp(&self) -> Option<i64> {
        self.reconciler.last_sync_timestamp()
    }

    pub fn dead_letter_actions(&self) -> Vec<PendingAction> {
        self.queue.dead_letters()
    }

    pub fn sync_state(&self) -> SyncState {
        SyncState {
            is_online: self.is_online(),
            is_syncing: self.is_syncing(),
            last_sync_timestamp: self.last_sync_timestamp(),
            pending_action_count: self.pending_action_count(),
            dead_letter_count: self.queue.dead_letter_count(),
        }
    }

    /// Receiver for connectivity changes, e.g. to drive a status badge
    pub fn subscribe_connectivity(&self) -> tokio::sync::watch::Receiver<bool> {
        self.connectivity.subscribe()
    }

    // ---------------------------------------------------------------------
    // Queue
    // ---------------------------------------------------------------------

    /// Record a mutation; drains immediately when online
    pub fn queue_action(&self, action_type: impl Into<String>, payload: Value) -> PendingAction {
        let action = self.queue.enqueue(action_type, payload);
        self.after_enqueue(&action);
        action
    }

    /// Record a typed CRM mutation
    ///
    /// # Errors
    /// Returns a serialization error if the payload cannot be encoded.
    pub fn queue_crm_action(&self, action: CrmAction) -> carebridge_domain::Result<PendingAction> {
        let action_type = action.action_type();
        let payload = action.into_payload()?;
        Ok(self.queue_action(action_type, payload))
    }

    fn after_enqueue(&self, action: &PendingAction) {
        if self.is_online() {
            self.drainer.spawn();
        } else {
            self.status.notify(notices::queued(action, self.queue.len()));
        }
    }

    /// Manual drain trigger
    pub async fn process_pending_actions(&self) -> DrainOutcome {
        self.drainer.run().await
    }

    /// Re-check real connectivity, then drain
    ///
    /// Without a probe this drains only if the cached state is online.
    #[instrument(skip(self))]
    pub async fn force_sync_attempt(&self) -> DrainOutcome {
        if let Some(probe) = &self.probe {
            let online = probe.check().await;
            debug!(online, "Connectivity probe result");
            if let Some(edge) = self.connectivity.set_online(online) {
                self.on_edge(edge).await;
            }
        }
        self.drainer.run().await
    }

    /// Feed the platform's connectivity signal into the engine
    ///
    /// On the online edge the triggered drain is awaited before returning.
    pub async fn set_online(&self, online: bool) -> Option<ConnectivityEdge> {
        let edge = self.connectivity.set_online(online)?;
        self.on_edge(edge).await;
        if edge == ConnectivityEdge::WentOnline {
            self.drainer.run().await;
        }
        Some(edge)
    }

    async fn on_edge(&self, edge: ConnectivityEdge) {
        let pending = self.queue.len();
        match edge {
            ConnectivityEdge::WentOnline => {
                self.status.notify(notices::went_online(pending));
            }
            ConnectivityEdge::WentOffline => {
                self.status.notify(notices::went_offline(pending));
                if pending > 0 {
                    self.bridge.register_if_supported().await;
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Dead letters
    // ---------------------------------------------------------------------

    /// Put an abandoned action back on the queue as a fresh action
    pub fn resubmit_dead_letter(&self, id: &str) -> Option<PendingAction> {
        let action = self.queue.resubmit_dead_letter(id)?;
        self.after_enqueue(&action);
        Some(action)
    }

    pub fn discard_dead_letter(&self, id: &str) -> bool {
        self.queue.discard_dead_letter(id)
    }

    // ---------------------------------------------------------------------
    // Cache
    // ---------------------------------------------------------------------

    pub fn store_offline_data(&self, key: impl Into<String>, value: Value) {
        self.cache.put(key, value);
    }

    pub fn get_offline_data(&self, key: &str) -> Option<Value> {
        self.cache.get(key)
    }

    /// Typed read; a payload that does not decode is logged and treated as
    /// absent
    pub fn get_offline_data_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                warn!(key = %key, error = %err, "Cached offline data has unexpected shape");
                None
            }
        }
    }

    pub fn remove_offline_data(&self, key: &str) -> Option<Value> {
        self.cache.remove(key)
    }

    /// Atomically empty the cache, the queue, the dead letters and the
    /// last-sync timestamp
    #[instrument(skip(self))]
    pub fn clear_offline_data(&self) {
        {
            // Lock order: queue, cache, last sync
            let mut queue = self.queue.lock_state();
            let mut cache = self.cache.lock_entries();
            let mut last_sync = self.reconciler.lock_last_sync();

            queue.clear();
            cache.clear();
            *last_sync = None;

            if !self.store.clear_all() {
                warn!("Some offline sections could not be removed from storage");
            }
        }

        info!("Cleared offline data");
        self.status.notify(notices::cleared());
    }
}
