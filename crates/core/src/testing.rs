//! Test doubles for the offline ports
//!
//! Shared by this crate's tests, the infra crate's tests and downstream
//! applications that want to exercise the engine without a network.

use std::collections::{HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use carebridge_common::error::CommonError;
use carebridge_domain::{PendingAction, StatusEvent, StatusKind};
use parking_lot::Mutex;
use tokio::sync::{Mutex as TokioMutex, Semaphore};

use crate::offline::errors::{BackgroundSyncError, ExecutionError, StorageError};
use crate::offline::ports::{
    BackgroundSyncRegistrar, ConnectivityProbe, ExecutionSink, StatusSink, StorageBackend,
};

/// Status sink that records every event
#[derive(Debug, Default)]
pub struct RecordingStatusSink {
    events: Mutex<Vec<StatusEvent>>,
}

impl RecordingStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<StatusEvent> {
        self.events.lock().clone()
    }

    pub fn kinds(&self) -> Vec<StatusKind> {
        self.events.lock().iter().map(|event| event.kind).collect()
    }

    pub fn count(&self, kind: StatusKind) -> usize {
        self.events.lock().iter().filter(|event| event.kind == kind).count()
    }

    /// Most recent event of the given kind
    pub fn last_of(&self, kind: StatusKind) -> Option<StatusEvent> {
        self.events.lock().iter().rev().find(|event| event.kind == kind).cloned()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl StatusSink for RecordingStatusSink {
    fn notify(&self, event: StatusEvent) {
        self.events.lock().push(event);
    }
}

/// Execution sink with scripted outcomes
///
/// Actions whose type was registered with [`with_failing_type`] always fail.
/// Otherwise the next scripted outcome is used, defaulting to success.
///
/// [`with_failing_type`]: ScriptedExecutionSink::with_failing_type
#[derive(Default)]
pub struct ScriptedExecutionSink {
    script: Mutex<VecDeque<Result<(), ExecutionError>>>,
    failing_types: Mutex<HashSet<String>>,
    attempts: TokioMutex<Vec<PendingAction>>,
}

impl ScriptedExecutionSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_failing_type(self, action_type: impl Into<String>) -> Self {
        self.failing_types.lock().insert(action_type.into());
        self
    }

    /// Queue outcomes consumed in order by attempts of non-failing types
    pub fn with_outcomes(
        self,
        outcomes: impl IntoIterator<Item = Result<(), ExecutionError>>,
    ) -> Self {
        self.script.lock().extend(outcomes);
        self
    }

    pub fn push_outcome(&self, outcome: Result<(), ExecutionError>) {
        self.script.lock().push_back(outcome);
    }

    pub fn stop_failing_type(&self, action_type: &str) {
        self.failing_types.lock().remove(action_type);
    }

    pub async fn attempts(&self) -> Vec<PendingAction> {
        self.attempts.lock().await.clone()
    }

    pub async fn attempt_count(&self) -> usize {
        self.attempts.lock().await.len()
    }
}

#[async_trait]
impl ExecutionSink for ScriptedExecutionSink {
    async fn execute(&self, action: &PendingAction) -> Result<(), ExecutionError> {
        self.attempts.lock().await.push(action.clone());

        if self.failing_types.lock().contains(&action.action_type) {
            return Err(ExecutionError::Network("simulated outage".into()));
        }

        let next = self.script.lock().pop_front();
        next.unwrap_or(Ok(()))
    }
}

/// Execution sink that blocks every attempt until released
///
/// Lets a test hold a drain pass open while it enqueues more work.
pub struct GatedExecutionSink {
    gate: Semaphore,
    entered: AtomicUsize,
    executed: TokioMutex<Vec<PendingAction>>,
}

impl GatedExecutionSink {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            entered: AtomicUsize::new(0),
            executed: TokioMutex::new(Vec::new()),
        }
    }

    /// Let `count` blocked or future attempts proceed
    pub fn release(&self, count: usize) {
        self.gate.add_permits(count);
    }

    /// Attempts that have started, including ones still blocked
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    pub async fn executed(&self) -> Vec<PendingAction> {
        self.executed.lock().await.clone()
    }
}

impl Default for GatedExecutionSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionSink for GatedExecutionSink {
    async fn execute(&self, action: &PendingAction) -> Result<(), ExecutionError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| ExecutionError::Network("gate closed".into()))?;
        permit.forget();
        self.executed.lock().await.push(action.clone());
        Ok(())
    }
}

/// Connectivity probe returning a settable answer
#[derive(Debug)]
pub struct StaticConnectivityProbe {
    online: AtomicBool,
    checks: AtomicUsize,
}

impl StaticConnectivityProbe {
    pub fn new(online: bool) -> Self {
        Self { online: AtomicBool::new(online), checks: AtomicUsize::new(0) }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectivityProbe for StaticConnectivityProbe {
    async fn check(&self) -> bool {
        self.checks.fetch_add(1, Ordering::SeqCst);
        self.online.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RegistrarMode {
    Accept,
    Unsupported,
    Fail,
}

/// Background-sync registrar that records requested tags
#[derive(Debug)]
pub struct RecordingBackgroundSync {
    mode: RegistrarMode,
    registrations: Mutex<Vec<String>>,
    delays: Mutex<Vec<Duration>>,
    attempts: AtomicUsize,
}

impl RecordingBackgroundSync {
    pub fn new() -> Self {
        Self::with_mode(RegistrarMode::Accept)
    }

    /// Registrar for a platform without background sync
    pub fn unsupported() -> Self {
        Self::with_mode(RegistrarMode::Unsupported)
    }

    /// Registrar whose registrations always error
    pub fn failing() -> Self {
        Self::with_mode(RegistrarMode::Fail)
    }

    fn with_mode(mode: RegistrarMode) -> Self {
        Self {
            mode,
            registrations: Mutex::new(Vec::new()),
            delays: Mutex::new(Vec::new()),
            attempts: AtomicUsize::new(0),
        }
    }

    /// Successfully registered tags, in order
    pub fn registrations(&self) -> Vec<String> {
        self.registrations.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Minimum delays passed with `register_after`, in order
    pub fn requested_delays(&self) -> Vec<Duration> {
        self.delays.lock().clone()
    }
}

impl Default for RecordingBackgroundSync {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BackgroundSyncRegistrar for RecordingBackgroundSync {
    async fn register(&self, tag: &str) -> Result<(), BackgroundSyncError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.mode {
            RegistrarMode::Accept => {
                self.registrations.lock().push(tag.to_string());
                Ok(())
            }
            RegistrarMode::Unsupported => Err(BackgroundSyncError::Unsupported),
            RegistrarMode::Fail => Err(BackgroundSyncError::Registration("quota exceeded".into())),
        }
    }

    async fn register_after(
        &self,
        tag: &str,
        min_delay: Duration,
    ) -> Result<(), BackgroundSyncError> {
        self.delays.lock().push(min_delay);
        self.register(tag).await
    }
}

/// Storage backend whose reads and/or writes fail
#[derive(Debug, Default)]
pub struct FailingStorage {
    fail_reads: bool,
    fail_writes: bool,
}

impl FailingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fail_reads(mut self) -> Self {
        self.fail_reads = true;
        self
    }

    pub fn with_fail_writes(mut self) -> Self {
        self.fail_writes = true;
        self
    }
}

impl StorageBackend for FailingStorage {
    fn read(&self, _key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads {
            return Err(StorageError::Unavailable("simulated read failure".into()));
        }
        Ok(None)
    }

    fn write(&self, key: &str, _value: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Common(CommonError::persistence_op(
                format!("write {key}"),
                "simulated disk full",
            )));
        }
        Ok(())
    }

    fn remove(&self, _key: &str) -> Result<(), StorageError> {
        if self.fail_writes {
            return Err(StorageError::Unavailable("simulated remove failure".into()));
        }
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "failing"
    }
}
