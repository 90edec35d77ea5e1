//! Synchronization statistics.

use std::sync::atomic::{AtomicU64, Ordering};

use mirror_core::ResourceKind;

/// Counters for watch-event application.
///
/// All counters are atomic and can be safely read from multiple threads.
/// Dropped events are the expected races of an eventually-consistent feed
/// (duplicates, dangling references, no-ops), not defects.
#[derive(Debug, Default)]
pub struct SyncStats {
    /// Namespace events applied to the cache.
    namespaces_applied: AtomicU64,
    /// Namespace events logged and dropped.
    namespaces_dropped: AtomicU64,
    /// Deployment events applied to the cache.
    deployments_applied: AtomicU64,
    /// Deployment events logged and dropped.
    deployments_dropped: AtomicU64,
}

impl SyncStats {
    /// Create zeroed statistics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an applied event.
    #[inline]
    pub fn record_applied(&self, kind: ResourceKind) {
        match kind {
            ResourceKind::Namespace => self.namespaces_applied.fetch_add(1, Ordering::Relaxed),
            ResourceKind::Deployment => self.deployments_applied.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Record a dropped event.
    #[inline]
    pub fn record_dropped(&self, kind: ResourceKind) {
        match kind {
            ResourceKind::Namespace => self.namespaces_dropped.fetch_add(1, Ordering::Relaxed),
            ResourceKind::Deployment => self.deployments_dropped.fetch_add(1, Ordering::Relaxed),
        };
    }

    /// Applied events for a kind.
    #[inline]
    pub fn applied(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Namespace => self.namespaces_applied.load(Ordering::Relaxed),
            ResourceKind::Deployment => self.deployments_applied.load(Ordering::Relaxed),
        }
    }

    /// Dropped events for a kind.
    #[inline]
    pub fn dropped(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::Namespace => self.namespaces_dropped.load(Ordering::Relaxed),
            ResourceKind::Deployment => self.deployments_dropped.load(Ordering::Relaxed),
        }
    }
}
