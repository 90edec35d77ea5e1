//! The synchronization engine: watch events in, cache mutations out.
//!
//! One handler set per resource kind, invoked independently; no ordering is
//! assumed between kinds, so a deployment event referencing a namespace the
//! cache has not seen yet is a normal, recoverable race. Every such event is
//! logged and dropped, never surfaced as an error.
//!
//! Each event is applied inside a single acquisition of the cache-wide lock,
//! and handler bodies are pure in-memory work.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use mirror_core::{
    DeploymentRecord, EventReceiver, MirrorError, MirrorResult, NamespaceRecord, ResourceKind,
    WatchEvent,
};

use crate::stats::SyncStats;
use crate::store::{MirrorCache, NamespaceEntry};

/// Per-kind synchronization progress.
#[derive(Debug, Clone, Copy, Default)]
struct KindProgress {
    /// The initial-sync marker has been observed.
    synced: bool,
    /// The stream has ended.
    closed: bool,
}

/// Aggregate synchronization state across both resource kinds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SyncState {
    namespaces: KindProgress,
    deployments: KindProgress,
}

impl SyncState {
    /// Whether both kinds have completed their initial sync.
    pub fn is_synced(&self) -> bool {
        self.namespaces.synced && self.deployments.synced
    }

    /// The first kind whose stream closed before completing initial sync,
    /// if any. A stream closing after its sync marker is not a failure of
    /// the initial synchronization step.
    fn failed_kind(&self) -> Option<ResourceKind> {
        if self.namespaces.closed && !self.namespaces.synced {
            Some(ResourceKind::Namespace)
        } else if self.deployments.closed && !self.deployments.synced {
            Some(ResourceKind::Deployment)
        } else {
            None
        }
    }
}

/// Handle to the running drain tasks plus the readiness signal.
#[derive(Debug)]
pub struct SyncHandle {
    namespace_task: JoinHandle<()>,
    deployment_task: JoinHandle<()>,
    synced: watch::Receiver<SyncState>,
}

impl SyncHandle {
    /// Wait until both watch streams have delivered their initial-sync
    /// marker.
    ///
    /// Fails if either stream closes first; that is the fatal
    /// initial-synchronization failure of the startup sequence, with no
    /// retry at this layer.
    pub async fn wait_synced(&mut self) -> MirrorResult<()> {
        loop {
            let state = *self.synced.borrow();
            if let Some(kind) = state.failed_kind() {
                return Err(MirrorError::WatchClosed { kind });
            }
            if state.is_synced() {
                return Ok(());
            }
            if self.synced.changed().await.is_err() {
                // Both tasks ended; one last look at the final state.
                let state = *self.synced.borrow();
                if state.is_synced() {
                    return Ok(());
                }
                let kind = state.failed_kind().unwrap_or(ResourceKind::Namespace);
                return Err(MirrorError::WatchClosed { kind });
            }
        }
    }

    /// Whether both kinds are past their initial sync.
    pub fn is_synced(&self) -> bool {
        self.synced.borrow().is_synced()
    }

    /// Abort both drain tasks.
    pub fn abort(&self) {
        self.namespace_task.abort();
        self.deployment_task.abort();
    }
}

/// Applies watch notifications to the [`MirrorCache`].
///
/// The engine is the only writer of the cache. Handlers enforce the
/// identity, duplication, and ordering safeguards; everything they reject is
/// counted in [`SyncStats`] and logged.
#[derive(Debug)]
pub struct SyncEngine {
    cache: Arc<MirrorCache>,
    stats: Arc<SyncStats>,
}

impl SyncEngine {
    /// Create an engine writing to `cache`.
    pub fn new(cache: Arc<MirrorCache>) -> Self {
        Self {
            cache,
            stats: Arc::new(SyncStats::new()),
        }
    }

    /// Event-application statistics.
    pub fn stats(&self) -> Arc<SyncStats> {
        Arc::clone(&self.stats)
    }

    /// Spawn the per-kind drain tasks and return a handle carrying the
    /// readiness signal.
    pub fn spawn(
        self,
        namespaces: EventReceiver<NamespaceRecord>,
        deployments: EventReceiver<DeploymentRecord>,
    ) -> SyncHandle {
        let engine = Arc::new(self);
        let (tx, rx) = watch::channel(SyncState::default());
        let tx = Arc::new(tx);

        let namespace_task = tokio::spawn(run_namespace_events(
            Arc::clone(&engine),
            namespaces,
            Arc::clone(&tx),
        ));
        let deployment_task = tokio::spawn(run_deployment_events(engine, deployments, tx));

        SyncHandle {
            namespace_task,
            deployment_task,
            synced: rx,
        }
    }

    /// Apply one namespace notification.
    ///
    /// The initial-sync marker is a no-op here; the drain loop consumes it.
    pub fn apply_namespace_event(&self, event: WatchEvent<NamespaceRecord>) {
        match event {
            WatchEvent::Added(record) => self.namespace_added(record),
            WatchEvent::Modified { old, new } => self.namespace_updated(old, new),
            WatchEvent::Deleted(record) => self.namespace_deleted(record),
            WatchEvent::InitialSyncComplete => {
                debug!("namespace sync marker reached apply path, ignoring");
            }
        }
    }

    /// Apply one deployment notification.
    ///
    /// The initial-sync marker is a no-op here; the drain loop consumes it.
    pub fn apply_deployment_event(&self, event: WatchEvent<DeploymentRecord>) {
        match event {
            WatchEvent::Added(record) => self.deployment_added(record),
            WatchEvent::Modified { old, new } => self.deployment_updated(old, new),
            WatchEvent::Deleted(record) => self.deployment_deleted(record),
            WatchEvent::InitialSyncComplete => {
                debug!("deployment sync marker reached apply path, ignoring");
            }
        }
    }

    fn namespace_added(&self, record: NamespaceRecord) {
        let mut state = self.cache.lock();
        if state.namespaces.contains_key(&record.name) {
            warn!(namespace = %record.name, "add event refs existing namespace, dropped");
            self.stats.record_dropped(ResourceKind::Namespace);
            return;
        }
        state
            .namespaces
            .insert(record.name.clone(), NamespaceEntry::default());
        info!(namespace = %record.name, "namespace created");
        self.stats.record_applied(ResourceKind::Namespace);
    }

    fn namespace_updated(&self, old: NamespaceRecord, new: NamespaceRecord) {
        // Only a name change is meaningful for a namespace.
        if old.name == new.name {
            warn!(namespace = %old.name, "update event is not a name change, dropped");
            self.stats.record_dropped(ResourceKind::Namespace);
            return;
        }
        let mut state = self.cache.lock();
        if !state.namespaces.contains_key(&old.name) {
            warn!(namespace = %old.name, "update event refs unknown old namespace, dropped");
            self.stats.record_dropped(ResourceKind::Namespace);
            return;
        }
        if state.namespaces.contains_key(&new.name) {
            warn!(
                old = %old.name,
                new = %new.name,
                "update event refs existing new namespace, dropped"
            );
            self.stats.record_dropped(ResourceKind::Namespace);
            return;
        }
        // Re-key, preserving all nested deployments.
        if let Some(entry) = state.namespaces.remove(&old.name) {
            state.namespaces.insert(new.name.clone(), entry);
        }
        info!(old = %old.name, new = %new.name, "namespace renamed");
        self.stats.record_applied(ResourceKind::Namespace);
    }

    fn namespace_deleted(&self, record: NamespaceRecord) {
        let mut state = self.cache.lock();
        if state.namespaces.remove(&record.name).is_none() {
            warn!(namespace = %record.name, "delete event refs unknown namespace, dropped");
            self.stats.record_dropped(ResourceKind::Namespace);
            return;
        }
        // Nested deployments go with the namespace; no separate delete
        // notifications arrive for them.
        info!(namespace = %record.name, "namespace deleted");
        self.stats.record_applied(ResourceKind::Namespace);
    }

    fn deployment_added(&self, record: DeploymentRecord) {
        let mut state = self.cache.lock();
        let Some(entry) = state.namespaces.get_mut(&record.namespace) else {
            // Normal race: the namespace add on the other stream has not
            // landed yet.
            warn!(
                namespace = %record.namespace,
                deployment = %record.name,
                "add event refs unknown namespace, dropped"
            );
            self.stats.record_dropped(ResourceKind::Deployment);
            return;
        };
        if entry.deployments.contains_key(&record.name) {
            warn!(
                namespace = %record.namespace,
                deployment = %record.name,
                "add event refs existing deployment, dropped"
            );
            self.stats.record_dropped(ResourceKind::Deployment);
            return;
        }
        entry.deployments.insert(record.name.clone(), record.replicas);
        info!(
            namespace = %record.namespace,
            deployment = %record.name,
            replicas = record.replicas,
            "deployment created"
        );
        self.stats.record_applied(ResourceKind::Deployment);
    }

    fn deployment_updated(&self, old: DeploymentRecord, new: DeploymentRecord) {
        if old.namespace != new.namespace {
            // Cross-namespace moves are not a supported transition; the old
            // namespace stays authoritative for locating the entry.
            error!(
                old_namespace = %old.namespace,
                new_namespace = %new.namespace,
                deployment = %old.name,
                "update event moves deployment across namespaces"
            );
        }
        let namespace = &old.namespace;
        let name_change = old.name != new.name;
        let replicas_change = old.replicas != new.replicas;
        if !name_change && !replicas_change {
            warn!(
                namespace = %namespace,
                deployment = %old.name,
                "update event carries no name or replica change, dropped"
            );
            self.stats.record_dropped(ResourceKind::Deployment);
            return;
        }

        let mut state = self.cache.lock();
        let Some(entry) = state.namespaces.get_mut(namespace) else {
            warn!(
                namespace = %namespace,
                deployment = %old.name,
                "update event refs unknown namespace, dropped"
            );
            self.stats.record_dropped(ResourceKind::Deployment);
            return;
        };
        if !entry.deployments.contains_key(&old.name) {
            warn!(
                namespace = %namespace,
                deployment = %old.name,
                "update event refs unknown deployment, dropped"
            );
            self.stats.record_dropped(ResourceKind::Deployment);
            return;
        }
        if name_change && entry.deployments.contains_key(&new.name) {
            warn!(
                namespace = %namespace,
                old = %old.name,
                new = %new.name,
                "update event renames onto existing deployment, dropped"
            );
            self.stats.record_dropped(ResourceKind::Deployment);
            return;
        }

        // The two deltas apply independently.
        if name_change {
            if let Some(replicas) = entry.deployments.remove(&old.name) {
                entry.deployments.insert(new.name.clone(), replicas);
            }
            info!(
                namespace = %namespace,
                old = %old.name,
                new = %new.name,
                "deployment renamed"
            );
        }
        if replicas_change {
            entry.deployments.insert(new.name.clone(), new.replicas);
            info!(
                namespace = %namespace,
                deployment = %new.name,
                old_replicas = old.replicas,
                new_replicas = new.replicas,
                "deployment replica count updated"
            );
        }
        self.stats.record_applied(ResourceKind::Deployment);
    }

    fn deployment_deleted(&self, record: DeploymentRecord) {
        let mut state = self.cache.lock();
        let Some(entry) = state.namespaces.get_mut(&record.namespace) else {
            warn!(
                namespace = %record.namespace,
                deployment = %record.name,
                "delete event refs unknown namespace, dropped"
            );
            self.stats.record_dropped(ResourceKind::Deployment);
            return;
        };
        if entry.deployments.remove(&record.name).is_none() {
            warn!(
                namespace = %record.namespace,
                deployment = %record.name,
                "delete event refs unknown deployment, dropped"
            );
            self.stats.record_dropped(ResourceKind::Deployment);
            return;
        }
        info!(
            namespace = %record.namespace,
            deployment = %record.name,
            "deployment deleted"
        );
        self.stats.record_applied(ResourceKind::Deployment);
    }
}

async fn run_namespace_events(
    engine: Arc<SyncEngine>,
    mut events: EventReceiver<NamespaceRecord>,
    synced: Arc<watch::Sender<SyncState>>,
) {
    while let Some(event) = events.recv().await {
        if event.is_sync_marker() {
            info!("namespace watch completed initial sync");
            synced.send_modify(|state| state.namespaces.synced = true);
            continue;
        }
        engine.apply_namespace_event(event);
    }
    warn!("namespace watch stream closed");
    synced.send_modify(|state| state.namespaces.closed = true);
}

async fn run_deployment_events(
    engine: Arc<SyncEngine>,
    mut events: EventReceiver<DeploymentRecord>,
    synced: Arc<watch::Sender<SyncState>>,
) {
    while let Some(event) = events.recv().await {
        if event.is_sync_marker() {
            info!("deployment watch completed initial sync");
            synced.send_modify(|state| state.deployments.synced = true);
            continue;
        }
        engine.apply_deployment_event(event);
    }
    warn!("deployment watch stream closed");
    synced.send_modify(|state| state.deployments.closed = true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn engine() -> (Arc<MirrorCache>, SyncEngine) {
        let cache = Arc::new(MirrorCache::new());
        let engine = SyncEngine::new(Arc::clone(&cache));
        (cache, engine)
    }

    fn ns(name: &str) -> NamespaceRecord {
        NamespaceRecord::new(name)
    }

    fn dep(namespace: &str, name: &str, replicas: u32) -> DeploymentRecord {
        DeploymentRecord::new(namespace, name, replicas)
    }

    #[test]
    fn namespace_add_then_duplicate() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        assert!(cache.namespace_exists("team-a"));

        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        assert_eq!(engine.stats.dropped(ResourceKind::Namespace), 1);
        assert_eq!(cache.namespace_names().len(), 1);
    }

    #[test]
    fn namespace_rename_preserves_deployments() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));

        engine.apply_namespace_event(WatchEvent::Modified {
            old: ns("team-a"),
            new: ns("team-alpha"),
        });
        assert!(!cache.namespace_exists("team-a"));
        assert_eq!(cache.replica_count("team-alpha", "web").unwrap(), 3);
    }

    #[test]
    fn namespace_rename_conflicts_and_noops_drop() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_namespace_event(WatchEvent::Added(ns("team-b")));

        // No-op update.
        engine.apply_namespace_event(WatchEvent::Modified {
            old: ns("team-a"),
            new: ns("team-a"),
        });
        // Rename onto an existing key.
        engine.apply_namespace_event(WatchEvent::Modified {
            old: ns("team-a"),
            new: ns("team-b"),
        });
        // Unknown old key.
        engine.apply_namespace_event(WatchEvent::Modified {
            old: ns("team-c"),
            new: ns("team-d"),
        });

        assert_eq!(engine.stats.dropped(ResourceKind::Namespace), 3);
        assert!(cache.namespace_exists("team-a"));
        assert!(cache.namespace_exists("team-b"));
    }

    #[test]
    fn namespace_delete_discards_nested_deployments() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));

        engine.apply_namespace_event(WatchEvent::Deleted(ns("team-a")));
        assert!(matches!(
            cache.deployments("team-a"),
            Err(MirrorError::NamespaceNotFound { .. })
        ));

        // Dangling delete drops.
        engine.apply_namespace_event(WatchEvent::Deleted(ns("team-a")));
        assert_eq!(engine.stats.dropped(ResourceKind::Namespace), 1);
    }

    #[test]
    fn deployment_add_before_namespace_is_dropped_not_fatal() {
        let (cache, engine) = engine();
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));
        assert_eq!(engine.stats.dropped(ResourceKind::Deployment), 1);
        assert!(!cache.deployment_exists("team-a", "web"));

        // Once the namespace lands, a re-delivered add takes.
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));
        assert_eq!(cache.replica_count("team-a", "web").unwrap(), 3);
    }

    #[test]
    fn duplicate_deployment_add_is_dropped() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 7)));

        assert_eq!(engine.stats.dropped(ResourceKind::Deployment), 1);
        // The original count survives the duplicate.
        assert_eq!(cache.replica_count("team-a", "web").unwrap(), 3);
    }

    #[test]
    fn deployment_rename_preserves_replicas() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));

        engine.apply_deployment_event(WatchEvent::Modified {
            old: dep("team-a", "web", 3),
            new: dep("team-a", "web2", 3),
        });
        assert!(!cache.deployment_exists("team-a", "web"));
        assert_eq!(cache.replica_count("team-a", "web2").unwrap(), 3);
    }

    #[test]
    fn deployment_update_applies_both_deltas_independently() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));

        // Replica-only change.
        engine.apply_deployment_event(WatchEvent::Modified {
            old: dep("team-a", "web", 3),
            new: dep("team-a", "web", 5),
        });
        assert_eq!(cache.replica_count("team-a", "web").unwrap(), 5);

        // Rename and replica change in one event.
        engine.apply_deployment_event(WatchEvent::Modified {
            old: dep("team-a", "web", 5),
            new: dep("team-a", "api", 2),
        });
        assert!(!cache.deployment_exists("team-a", "web"));
        assert_eq!(cache.replica_count("team-a", "api").unwrap(), 2);
    }

    #[test]
    fn deployment_update_drop_cases() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "api", 1)));

        // No-op.
        engine.apply_deployment_event(WatchEvent::Modified {
            old: dep("team-a", "web", 3),
            new: dep("team-a", "web", 3),
        });
        // Unknown namespace.
        engine.apply_deployment_event(WatchEvent::Modified {
            old: dep("team-x", "web", 3),
            new: dep("team-x", "web", 4),
        });
        // Unknown old deployment.
        engine.apply_deployment_event(WatchEvent::Modified {
            old: dep("team-a", "ghost", 3),
            new: dep("team-a", "ghost", 4),
        });
        // Rename onto an existing name.
        engine.apply_deployment_event(WatchEvent::Modified {
            old: dep("team-a", "web", 3),
            new: dep("team-a", "api", 3),
        });

        assert_eq!(engine.stats.dropped(ResourceKind::Deployment), 4);
        assert_eq!(cache.replica_count("team-a", "web").unwrap(), 3);
        assert_eq!(cache.replica_count("team-a", "api").unwrap(), 1);
    }

    #[test]
    fn cross_namespace_move_keeps_old_namespace_authoritative() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_namespace_event(WatchEvent::Added(ns("team-b")));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));

        engine.apply_deployment_event(WatchEvent::Modified {
            old: dep("team-a", "web", 3),
            new: dep("team-b", "web", 5),
        });

        // The entry stays under team-a with the new replica count.
        assert_eq!(cache.replica_count("team-a", "web").unwrap(), 5);
        assert!(!cache.deployment_exists("team-b", "web"));
    }

    #[test]
    fn deployment_delete_and_dangling_delete() {
        let (cache, engine) = engine();
        engine.apply_namespace_event(WatchEvent::Added(ns("team-a")));
        engine.apply_deployment_event(WatchEvent::Added(dep("team-a", "web", 3)));

        engine.apply_deployment_event(WatchEvent::Deleted(dep("team-a", "web", 3)));
        assert!(!cache.deployment_exists("team-a", "web"));

        engine.apply_deployment_event(WatchEvent::Deleted(dep("team-a", "web", 3)));
        engine.apply_deployment_event(WatchEvent::Deleted(dep("team-x", "web", 3)));
        assert_eq!(engine.stats.dropped(ResourceKind::Deployment), 2);
    }

    #[tokio::test]
    async fn drain_tasks_flip_readiness_on_sync_markers() {
        let (cache, engine) = engine();
        let (ns_tx, ns_rx) = mpsc::channel(8);
        let (dep_tx, dep_rx) = mpsc::channel(8);
        let mut handle = engine.spawn(ns_rx, dep_rx);

        ns_tx.send(WatchEvent::Added(ns("team-a"))).await.unwrap();
        ns_tx.send(WatchEvent::InitialSyncComplete).await.unwrap();
        dep_tx
            .send(WatchEvent::Added(dep("team-a", "web", 3)))
            .await
            .unwrap();
        dep_tx.send(WatchEvent::InitialSyncComplete).await.unwrap();

        handle.wait_synced().await.unwrap();
        assert!(handle.is_synced());
        assert_eq!(cache.replica_count("team-a", "web").unwrap(), 3);
        handle.abort();
    }

    #[tokio::test]
    async fn stream_closing_before_sync_is_fatal() {
        let (_cache, engine) = engine();
        let (ns_tx, ns_rx) = mpsc::channel::<WatchEvent<NamespaceRecord>>(8);
        let (dep_tx, dep_rx) = mpsc::channel(8);
        let mut handle = engine.spawn(ns_rx, dep_rx);

        dep_tx.send(WatchEvent::InitialSyncComplete).await.unwrap();
        drop(ns_tx);

        let err = handle.wait_synced().await.unwrap_err();
        assert!(matches!(
            err,
            MirrorError::WatchClosed {
                kind: ResourceKind::Namespace
            }
        ));
        handle.abort();
    }
}
