//! Online/offline state with edge detection
//!
//! No debouncing: every change of state is one edge, so rapid flapping
//! produces one event per transition.

use carebridge_domain::ConnectivityEdge;
use tokio::sync::watch;
use tracing::info;

pub struct ConnectivityMonitor {
    state: watch::Sender<bool>,
}

impl ConnectivityMonitor {
    pub fn new(initially_online: bool) -> Self {
        let (state, _) = watch::channel(initially_online);
        Self { state }
    }

    pub fn is_online(&self) -> bool {
        *self.state.borrow()
    }

    /// Record the platform's connectivity signal
    ///
    /// Returns the edge when the state actually changed, `None` otherwise.
    pub fn set_online(&self, online: bool) -> Option<ConnectivityEdge> {
        let changed = self.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if !changed {
            return None;
        }

        let edge =
            if online { ConnectivityEdge::WentOnline } else { ConnectivityEdge::WentOffline };
        info!(?edge, "Connectivity changed");
        Some(edge)
    }

    /// Receiver that observes every published state
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.state.subscribe()
    }
}
