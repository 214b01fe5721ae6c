//! Status events emitted by the offline engine

use carebridge_domain::{DrainReport, PendingAction, StatusEvent, StatusKind, StatusSeverity};

fn plural(count: usize, noun: &str) -> String {
    if count == 1 {
        format!("1 {noun}")
    } else {
        format!("{count} {noun}s")
    }
}

pub fn went_offline(pending: usize) -> StatusEvent {
    let description = if pending == 0 {
        "Changes you make will be saved and synced when you're back online.".to_string()
    } else {
        format!(
            "{} waiting. New changes will be queued until you're back online.",
            plural(pending, "change")
        )
    };
    StatusEvent::new(
        StatusKind::WentOffline,
        StatusSeverity::Warning,
        "You're offline",
        description,
    )
}

pub fn went_online(pending: usize) -> StatusEvent {
    let description = if pending == 0 {
        "All changes are up to date.".to_string()
    } else {
        format!("Syncing {} made while offline.", plural(pending, "change"))
    };
    StatusEvent::new(StatusKind::WentOnline, StatusSeverity::Info, "Back online", description)
}

pub fn queued(action: &PendingAction, pending: usize) -> StatusEvent {
    StatusEvent::new(
        StatusKind::Queued,
        StatusSeverity::Info,
        "Saved offline",
        format!(
            "'{}' will sync when you're back online ({} pending).",
            action.action_type,
            plural(pending, "change")
        ),
    )
}

pub fn syncing(count: usize) -> StatusEvent {
    StatusEvent::new(
        StatusKind::Syncing,
        StatusSeverity::Info,
        "Syncing",
        format!("Syncing {}.", plural(count, "pending action")),
    )
}

/// Outcome event for a completed pass: synced, partial or failed
///
/// Only actions still on the queue are promised a retry; dead-lettered ones
/// are pointed at the review list.
pub fn drain_outcome(report: &DrainReport) -> StatusEvent {
    if report.is_complete() {
        return StatusEvent::new(
            StatusKind::Synced,
            StatusSeverity::Success,
            "Sync complete",
            format!("{} synced.", plural(report.completed, "action")),
        );
    }

    let follow_up = follow_up(report);
    if report.completed > 0 {
        return StatusEvent::new(
            StatusKind::Partial,
            StatusSeverity::Warning,
            "Partial sync",
            format!("{} of {} actions synced.{follow_up}", report.completed, report.attempted),
        );
    }

    StatusEvent::new(
        StatusKind::Failed,
        StatusSeverity::Error,
        "Sync failed",
        format!(
            "None of {} could be synced.{follow_up}",
            plural(report.attempted, "pending action")
        ),
    )
}

fn follow_up(report: &DrainReport) -> String {
    let mut text = String::new();
    if report.failed > 0 {
        text.push_str(&format!(" {} will be retried.", plural(report.failed, "action")));
    }
    if report.dead_lettered > 0 {
        text.push_str(&format!(
            " {} moved to the review list.",
            plural(report.dead_lettered, "action")
        ));
    }
    text
}

pub fn escalated(count: usize) -> StatusEvent {
    StatusEvent::new(
        StatusKind::Escalated,
        StatusSeverity::Warning,
        "Sync keeps failing",
        format!(
            "{} failed repeatedly and may need manual attention.",
            plural(count, "action")
        ),
    )
}

pub fn abandoned(count: usize) -> StatusEvent {
    StatusEvent::new(
        StatusKind::Failed,
        StatusSeverity::Error,
        "Action abandoned",
        format!(
            "{} could not be synced and moved to the review list. Resubmit or discard them there.",
            plural(count, "action")
        ),
    )
}

pub fn cleared() -> StatusEvent {
    StatusEvent::new(
        StatusKind::Cleared,
        StatusSeverity::Success,
        "Offline data cleared",
        "Cached data and pending changes were removed from this device.",
    )
}
