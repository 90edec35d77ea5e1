//! Watch-event model for control-plane notifications.
//!
//! Each resource kind has its own event stream. Within a kind, events for a
//! single object arrive in order; nothing is guaranteed across objects or
//! across kinds. Consumers must tolerate events that reference state they
//! have not seen yet (for example a deployment add before its namespace add).

use tokio::sync::mpsc;

/// A single notification from a control-plane watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent<T> {
    /// A resource was created.
    Added(T),
    /// A resource changed. Both the previous and the current record are
    /// delivered so consumers can compute deltas.
    Modified {
        /// The record before the change.
        old: T,
        /// The record after the change.
        new: T,
    },
    /// A resource was deleted.
    Deleted(T),
    /// The stream has replayed all pre-existing resources. Delivered exactly
    /// once per subscription, after the initial listing has been added.
    InitialSyncComplete,
}

impl<T> WatchEvent<T> {
    /// Whether this is the initial-sync marker rather than a resource event.
    pub fn is_sync_marker(&self) -> bool {
        matches!(self, Self::InitialSyncComplete)
    }
}

/// Receiving half of a per-kind watch subscription.
pub type EventReceiver<T> = mpsc::Receiver<WatchEvent<T>>;

/// Sending half of a per-kind watch subscription, held by client
/// implementations.
pub type EventSender<T> = mpsc::Sender<WatchEvent<T>>;
