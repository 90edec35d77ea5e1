//! The control-plane client seam.
//!
//! The client is an external collaborator: connection setup, authentication,
//! watch transport, and reconnection policy all live behind this trait. The
//! mirror only requires the three capabilities below: per-kind watch
//! subscriptions, a point read of a deployment's scale, and a point write of
//! a scale.

use async_trait::async_trait;

use crate::error::MirrorError;
use crate::event::EventReceiver;
use crate::resource::{DeploymentRecord, NamespaceRecord, Scale};

/// Interface to the authoritative control plane.
///
/// Watch subscriptions deliver add/update/delete notifications followed by a
/// single [`WatchEvent::InitialSyncComplete`] marker once pre-existing
/// resources have been replayed. Failures from the scale calls are opaque and
/// propagated upward without retry.
///
/// [`WatchEvent::InitialSyncComplete`]: crate::WatchEvent::InitialSyncComplete
#[async_trait]
pub trait ControlPlaneClient: Send + Sync + 'static {
    /// Subscribe to namespace add/update/delete notifications.
    ///
    /// `buffer` bounds the delivery channel; the client applies its own
    /// backpressure policy when the consumer lags.
    async fn watch_namespaces(
        &self,
        buffer: usize,
    ) -> Result<EventReceiver<NamespaceRecord>, MirrorError>;

    /// Subscribe to deployment add/update/delete notifications.
    async fn watch_deployments(
        &self,
        buffer: usize,
    ) -> Result<EventReceiver<DeploymentRecord>, MirrorError>;

    /// Read the current scale representation of a deployment.
    async fn get_scale(&self, namespace: &str, name: &str) -> Result<Scale, MirrorError>;

    /// Write a scale representation for a deployment.
    ///
    /// Returns the scale as accepted by the control plane.
    async fn update_scale(
        &self,
        namespace: &str,
        name: &str,
        scale: Scale,
    ) -> Result<Scale, MirrorError>;
}
