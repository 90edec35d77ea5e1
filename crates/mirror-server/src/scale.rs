//! The mutation path: write-through replica scaling.
//!
//! Scaling bypasses the cache entirely. The current scale representation is
//! read from the control plane, the caller's requested count is written into
//! it, and it is submitted back. The cache only reflects the result once the
//! synchronization engine observes the resulting deployment-update event, so
//! a read issued immediately after a successful scale may still report the
//! old count. That read-after-write window is a documented property of the
//! system, not a bug.
//!
//! No retry and no conflict handling: a failure from either call aborts the
//! operation and surfaces as an internal error.

use tracing::{debug, info};

use mirror_core::{ControlPlaneClient, MirrorResult};

/// Scale a deployment to `replicas` on the authoritative source.
///
/// The submitted scale always carries the *requested* count. The preceding
/// read exists only to obtain the rest of the scale representation (such as
/// the opaque version token); its replica value is never written back.
pub async fn set_replicas(
    client: &dyn ControlPlaneClient,
    namespace: &str,
    name: &str,
    replicas: u32,
) -> MirrorResult<()> {
    debug!(namespace, deployment = name, requested = replicas, "scaling deployment");

    let mut scale = client.get_scale(namespace, name).await?;
    let observed = scale.replicas;

    // The contract of this path: submit the requested value, not the value
    // just read.
    scale.replicas = replicas;
    client.update_scale(namespace, name, scale).await?;

    info!(
        namespace,
        deployment = name,
        observed,
        requested = replicas,
        "scale submitted"
    );
    Ok(())
}
