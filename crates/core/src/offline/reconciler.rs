//! Sync reconciler: drains the action queue against the execution sink
//!
//! States are `Idle` and `Draining`. A pass:
//! 1. bails out when closed, offline, already draining or the queue is empty
//! 2. snapshots the queue
//! 3. executes each snapshot action in order, one at a time
//! 4. merges results back against the *current* queue (per id, so actions
//!    enqueued during the pass are untouched)
//! 5. stamps `lastSyncTimestamp`
//! 6. reports the outcome to the status sink
//!
//! A clear that lands while actions are executing wins: the pass does not
//! stamp the last sync and reports nothing to the status sink.
//!
//! Completion order across retries is not FIFO: a later action may complete
//! while an earlier one is still being retried.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use carebridge_common::error::ErrorClassification;
use carebridge_common::time::Clock;
use carebridge_domain::{DrainOutcome, DrainReport, PendingAction, SkipReason, SyncConfig};
use parking_lot::{Mutex, MutexGuard};
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use super::connectivity::ConnectivityMonitor;
use super::errors::ExecutionError;
use super::notices;
use super::ports::{ExecutionSink, StatusSink};
use super::queue::ActionQueue;
use super::store::DurableStore;

/// Retry thresholds applied after each failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Failed attempts after which an action is dead-lettered
    pub max_attempts: u32,
    /// Failed attempts after which a queued action is escalated
    pub escalation_threshold: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&SyncConfig::default())
    }
}

impl From<&SyncConfig> for RetryPolicy {
    fn from(config: &SyncConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            escalation_threshold: config.escalation_threshold,
        }
    }
}

impl RetryPolicy {
    fn should_dead_letter(&self, failed_attempts: u32, error: &ExecutionError) -> bool {
        failed_attempts >= self.max_attempts || !error.is_retryable()
    }

    fn should_escalate(&self, failed_attempts: u32) -> bool {
        failed_attempts >= self.escalation_threshold
    }
}

/// Resets the draining flag when a pass ends, however it ends
struct DrainGuard<'a> {
    flag: &'a AtomicBool,
    idle: &'a Notify,
}

impl<'a> DrainGuard<'a> {
    fn acquire(flag: &'a AtomicBool, idle: &'a Notify) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag, idle })
    }
}

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
        self.idle.notify_waiters();
    }
}

pub struct SyncReconciler {
    queue: Arc<ActionQueue>,
    connectivity: Arc<ConnectivityMonitor>,
    executor: Arc<dyn ExecutionSink>,
    status: Arc<dyn StatusSink>,
    store: Arc<DurableStore>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
    draining: AtomicBool,
    closed: AtomicBool,
    idle: Notify,
    last_sync: Mutex<Option<i64>>,
}

impl SyncReconciler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        queue: Arc<ActionQueue>,
        connectivity: Arc<ConnectivityMonitor>,
        executor: Arc<dyn ExecutionSink>,
        status: Arc<dyn StatusSink>,
        store: Arc<DurableStore>,
        clock: Arc<dyn Clock>,
        policy: RetryPolicy,
        last_sync: Option<i64>,
    ) -> Self {
        Self {
            queue,
            connectivity,
            executor,
            status,
            store,
            clock,
            policy,
            draining: AtomicBool::new(false),
            closed: AtomicBool::new(false),
            idle: Notify::new(),
            last_sync: Mutex::new(last_sync),
        }
    }

    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::Acquire)
    }

    pub fn last_sync_timestamp(&self) -> Option<i64> {
        *self.last_sync.lock()
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Run one drain pass if the guards allow it
    #[instrument(skip(self))]
    pub async fn drain(&self) -> DrainOutcome {
        if self.closed.load(Ordering::Acquire) {
            return DrainOutcome::Skipped(SkipReason::ShuttingDown);
        }
        if !self.connectivity.is_online() {
            debug!("Skipping drain while offline");
            return DrainOutcome::Skipped(SkipReason::Offline);
        }
        let Some(_guard) = DrainGuard::acquire(&self.draining, &self.idle) else {
            debug!("Drain already in flight");
            return DrainOutcome::Skipped(SkipReason::AlreadyDraining);
        };

        let (generation, snapshot) = self.queue.snapshot_with_generation();
        if snapshot.is_empty() {
            return DrainOutcome::Skipped(SkipReason::EmptyQueue);
        }

        info!(actions = snapshot.len(), "Starting drain pass");
        self.status.notify(notices::syncing(snapshot.len()));

        let mut completed: Vec<&PendingAction> = Vec::new();
        let mut failed: Vec<(&PendingAction, ExecutionError)> = Vec::new();

        for action in &snapshot {
            match self.executor.execute(action).await {
                Ok(()) => {
                    debug!(
                        action_id = %action.id,
                        action_type = %action.action_type,
                        "Action synced"
                    );
                    completed.push(action);
                }
                Err(err) => {
                    warn!(
                        action_id = %action.id,
                        action_type = %action.action_type,
                        retry_count = action.retry_count,
                        error = %err,
                        "Action execution failed"
                    );
                    failed.push((action, err));
                }
            }
        }

        let report = self.merge(snapshot.len(), &completed, &failed);

        let cleared = {
            // Same lock order as the atomic clear: queue, then last sync
            let queue = self.queue.lock_state();
            let cleared = queue.generation() != generation;
            if !cleared {
                let now = self.clock.now_millis();
                *self.last_sync.lock() = Some(now);
                self.store.persist_last_sync(Some(now));
            }
            cleared
        };

        if cleared {
            info!(
                attempted = snapshot.len(),
                "Offline data cleared during drain; results discarded"
            );
            return DrainOutcome::Completed(DrainReport {
                attempted: snapshot.len(),
                ..DrainReport::default()
            });
        }

        self.report(&report);
        DrainOutcome::Completed(report)
    }

    fn merge(
        &self,
        attempted: usize,
        completed: &[&PendingAction],
        failed: &[(&PendingAction, ExecutionError)],
    ) -> DrainReport {
        let mut report = DrainReport { attempted, ..DrainReport::default() };

        // Counts only what actually changed in the queue; entries removed
        // by a concurrent clear are not reported.
        for action in completed {
            if self.queue.mark_completed(&action.id) {
                report.completed += 1;
            }
        }

        for (action, err) in failed {
            let failed_attempts = action.retry_count.saturating_add(1);
            if self.policy.should_dead_letter(failed_attempts, err) {
                if self.queue.dead_letter(action) {
                    report.dead_lettered += 1;
                }
                continue;
            }

            if let Some(updated) = self.queue.mark_failed(action) {
                report.failed += 1;
                if let Some(delay) = err.retry_after() {
                    let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
                    report.retry_after_ms = report.retry_after_ms.max(Some(millis));
                }
                if self.policy.should_escalate(updated.retry_count) {
                    warn!(
                        action_id = %updated.id,
                        action_type = %updated.action_type,
                        retry_count = updated.retry_count,
                        "Action keeps failing and may need manual intervention"
                    );
                    report.escalated += 1;
                }
            }
        }

        report
    }

    fn report(&self, report: &DrainReport) {
        info!(
            attempted = report.attempted,
            completed = report.completed,
            failed = report.failed,
            dead_lettered = report.dead_lettered,
            escalated = report.escalated,
            retry_after_ms = report.retry_after_ms,
            "Drain pass finished"
        );

        self.status.notify(notices::drain_outcome(report));
        if report.escalated > 0 {
            self.status.notify(notices::escalated(report.escalated));
        }
        if report.dead_lettered > 0 {
            self.status.notify(notices::abandoned(report.dead_lettered));
        }
    }

    /// Refuse new passes from now on
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Wait until no pass is in flight
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.idle.notified();
            if !self.is_draining() {
                return;
            }
            notified.await;
        }
    }

    /// Write the last-sync section regardless of whether it changed
    pub fn flush(&self) -> bool {
        let last_sync = self.last_sync.lock();
        self.store.persist_last_sync(*last_sync)
    }

    /// Held during an atomic clear across cache, queue and last-sync state
    pub(crate) fn lock_last_sync(&self) -> MutexGuard<'_, Option<i64>> {
        self.last_sync.lock()
    }
}
