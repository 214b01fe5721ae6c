//! Status events handed to the notification layer

use serde::{Deserialize, Serialize};

use crate::impl_domain_status_conversions;

/// Transition that produced a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusKind {
    WentOffline,
    WentOnline,
    Queued,
    Syncing,
    Synced,
    Partial,
    Failed,
    Escalated,
    Cleared,
}

impl_domain_status_conversions!(StatusKind {
    WentOffline => "wentoffline",
    WentOnline => "wentonline",
    Queued => "queued",
    Syncing => "syncing",
    Synced => "synced",
    Partial => "partial",
    Failed => "failed",
    Escalated => "escalated",
    Cleared => "cleared",
});

/// Presentation severity of a status event
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusSeverity {
    Info,
    Success,
    Warning,
    Error,
}

impl_domain_status_conversions!(StatusSeverity {
    Info => "info",
    Success => "success",
    Warning => "warning",
    Error => "error",
});

/// A human-readable notification about an offline-engine transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    pub kind: StatusKind,
    pub title: String,
    pub description: String,
    pub severity: StatusSeverity,
}

impl StatusEvent {
    pub fn new(
        kind: StatusKind,
        severity: StatusSeverity,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self { kind, title: title.into(), description: description.into(), severity }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn kinds_round_trip_through_display() {
        assert_eq!(StatusKind::Partial.to_string(), "partial");
        assert_eq!(StatusKind::from_str("Synced").unwrap(), StatusKind::Synced);
    }

    #[test]
    fn severity_orders_by_urgency() {
        assert!(StatusSeverity::Info < StatusSeverity::Warning);
        assert!(StatusSeverity::Warning < StatusSeverity::Error);
    }
}
