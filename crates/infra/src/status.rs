//! Status sink implementations
//!
//! The engine reports through a single [`StatusSink`]. Hosts usually want
//! more than one destination (a log line and a UI toast), so
//! [`FanoutStatusSink`] forwards each event to several sinks.

use std::sync::Arc;

use carebridge_core::StatusSink;
use carebridge_domain::{StatusEvent, StatusSeverity};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

/// Writes every status event to the `tracing` log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingStatusSink;

impl StatusSink for TracingStatusSink {
    fn notify(&self, event: StatusEvent) {
        match event.severity {
            StatusSeverity::Error => {
                error!(
                    kind = ?event.kind,
                    title = %event.title,
                    description = %event.description,
                    "status"
                );
            }
            StatusSeverity::Warning => {
                warn!(
                    kind = ?event.kind,
                    title = %event.title,
                    description = %event.description,
                    "status"
                );
            }
            StatusSeverity::Info | StatusSeverity::Success => {
                info!(
                    kind = ?event.kind,
                    title = %event.title,
                    description = %event.description,
                    "status"
                );
            }
        }
    }
}

/// Publishes status events to any number of async subscribers
///
/// Slow subscribers lose the oldest events once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct BroadcastStatusSink {
    sender: broadcast::Sender<StatusEvent>,
}

impl BroadcastStatusSink {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StatusEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastStatusSink {
    fn default() -> Self {
        Self::new(64)
    }
}

impl StatusSink for BroadcastStatusSink {
    fn notify(&self, event: StatusEvent) {
        if self.sender.send(event).is_err() {
            debug!("status event dropped, no subscribers");
        }
    }
}

/// Forwards each event to every inner sink in order
#[derive(Default, Clone)]
pub struct FanoutStatusSink {
    sinks: Vec<Arc<dyn StatusSink>>,
}

impl FanoutStatusSink {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, sink: Arc<dyn StatusSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl StatusSink for FanoutStatusSink {
    fn notify(&self, event: StatusEvent) {
        if let Some((last, rest)) = self.sinks.split_last() {
            for sink in rest {
                sink.notify(event.clone());
            }
            last.notify(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use carebridge_core::testing::RecordingStatusSink;
    use carebridge_domain::StatusKind;

    use super::*;

    fn event(kind: StatusKind, severity: StatusSeverity) -> StatusEvent {
        StatusEvent::new(kind, severity, "Title", "Description")
    }

    #[tokio::test]
    async fn broadcast_reaches_every_subscriber() {
        let sink = BroadcastStatusSink::new(8);
        let mut first = sink.subscribe();
        let mut second = sink.subscribe();
        assert_eq!(sink.subscriber_count(), 2);

        sink.notify(event(StatusKind::WentOffline, StatusSeverity::Warning));

        assert_eq!(first.recv().await.unwrap().kind, StatusKind::WentOffline);
        assert_eq!(second.recv().await.unwrap().kind, StatusKind::WentOffline);
    }

    #[test]
    fn broadcast_without_subscribers_does_not_fail() {
        let sink = BroadcastStatusSink::default();
        sink.notify(event(StatusKind::Synced, StatusSeverity::Success));
        assert_eq!(sink.subscriber_count(), 0);
    }

    #[test]
    fn fanout_delivers_to_all_sinks() {
        let a = Arc::new(RecordingStatusSink::new());
        let b = Arc::new(RecordingStatusSink::new());
        let fanout = FanoutStatusSink::new()
            .with(a.clone())
            .with(Arc::new(TracingStatusSink))
            .with(b.clone());
        assert_eq!(fanout.len(), 3);

        fanout.notify(event(StatusKind::Escalated, StatusSeverity::Warning));

        assert_eq!(a.kinds(), vec![StatusKind::Escalated]);
        assert_eq!(b.kinds(), vec![StatusKind::Escalated]);
    }

    #[test]
    fn empty_fanout_is_a_no_op() {
        let fanout = FanoutStatusSink::new();
        assert!(fanout.is_empty());
        fanout.notify(event(StatusKind::Cleared, StatusSeverity::Info));
    }
}
