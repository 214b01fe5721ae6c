//! Shared fixtures for offline engine integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use carebridge_common::time::MockClock;
use carebridge_core::testing::{RecordingStatusSink, ScriptedExecutionSink};
use carebridge_core::{
    ExecutionSink, MemoryStorage, OfflineSyncDeps, OfflineSyncService, RetryPolicy, SyncSettings,
};

pub const START_MILLIS: i64 = 1_700_000_000_000;

pub struct Harness<E> {
    pub service: Arc<OfflineSyncService>,
    pub status: Arc<RecordingStatusSink>,
    pub executor: Arc<E>,
    pub storage: Arc<MemoryStorage>,
    pub clock: MockClock,
}

/// Harness builder with sensible defaults: offline, memory storage, mock
/// clock, default retry policy.
pub struct HarnessBuilder<E> {
    executor: Arc<E>,
    storage: Arc<MemoryStorage>,
    online: bool,
    policy: RetryPolicy,
    deps_hook: Option<Box<dyn FnOnce(OfflineSyncDeps) -> OfflineSyncDeps>>,
}

impl<E: ExecutionSink + 'static> HarnessBuilder<E> {
    pub fn new(executor: E) -> Self {
        Self {
            executor: Arc::new(executor),
            storage: Arc::new(MemoryStorage::new()),
            online: false,
            policy: RetryPolicy::default(),
            deps_hook: None,
        }
    }

    pub fn online(mut self) -> Self {
        self.online = true;
        self
    }

    pub fn storage(mut self, storage: Arc<MemoryStorage>) -> Self {
        self.storage = storage;
        self
    }

    pub fn policy(mut self, max_attempts: u32, escalation_threshold: u32) -> Self {
        self.policy = RetryPolicy { max_attempts, escalation_threshold };
        self
    }

    pub fn with_deps(
        mut self,
        hook: impl FnOnce(OfflineSyncDeps) -> OfflineSyncDeps + 'static,
    ) -> Self {
        self.deps_hook = Some(Box::new(hook));
        self
    }

    pub fn build(self) -> Harness<E> {
        let status = Arc::new(RecordingStatusSink::new());
        let clock = MockClock::at(START_MILLIS);

        let mut deps =
            OfflineSyncDeps::new(self.storage.clone(), self.executor.clone(), status.clone())
                .with_clock(Arc::new(clock.clone()));
        if let Some(hook) = self.deps_hook {
            deps = hook(deps);
        }

        let settings = SyncSettings { retry: self.policy, ..SyncSettings::default() }
            .initially_online(self.online);
        let service = OfflineSyncService::init(deps, settings);

        Harness { service, status, executor: self.executor, storage: self.storage, clock }
    }
}

pub fn scripted() -> HarnessBuilder<ScriptedExecutionSink> {
    HarnessBuilder::new(ScriptedExecutionSink::new())
}
