//! The cache store: one nested map behind one exclusive lock.
//!
//! The store is split into two layers to make the locking discipline a
//! property of the types rather than of caller discipline:
//!
//! - [`CacheState`] holds the nested namespace → deployment → replica map and
//!   implements every read primitive. Its methods take `&self` on an already
//!   guarded value, so they can be freely composed without ever touching the
//!   lock. Composite reads call single-item primitives here.
//! - [`MirrorCache`] owns the `parking_lot::Mutex<CacheState>` and exposes
//!   public wrappers that acquire the lock exactly once per call.
//!
//! The lock is not reentrant; nothing in this module (or its callers) may
//! acquire it while already holding it. Since primitives only exist on the
//! guarded state, that path does not exist in the public API.
//!
//! All returned values are owned copies; no alias into the cache escapes the
//! critical section.

use std::collections::HashMap;

use parking_lot::{Mutex, MutexGuard};
use tracing::trace;

use mirror_core::{MirrorError, MirrorResult};

/// A deployment name with its last observed replica count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaCount {
    /// Deployment name.
    pub name: String,
    /// Last observed desired replica count.
    pub replicas: u32,
}

/// A namespace name with the deployments it owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDeployments {
    /// Namespace name.
    pub namespace: String,
    /// Deployments in the namespace, unordered.
    pub deployments: Vec<ReplicaCount>,
}

/// A namespace entry: the deployments it owns, keyed by name.
#[derive(Debug, Clone, Default)]
pub(crate) struct NamespaceEntry {
    /// Deployment name → replica count.
    pub(crate) deployments: HashMap<String, u32>,
}

/// The guarded cache state. Every method here is a lock-free primitive
/// operating on an already-acquired guard.
#[derive(Debug, Default)]
pub struct CacheState {
    /// Namespace name → entry.
    pub(crate) namespaces: HashMap<String, NamespaceEntry>,
}

impl CacheState {
    /// All namespace names, in no particular order.
    pub fn namespace_names(&self) -> Vec<String> {
        self.namespaces.keys().cloned().collect()
    }

    /// Whether the namespace has an entry.
    pub fn namespace_exists(&self, namespace: &str) -> bool {
        self.namespaces.contains_key(namespace)
    }

    /// Whether the deployment has an entry.
    ///
    /// Returns `false` (not an error) when the namespace itself is absent.
    pub fn deployment_exists(&self, namespace: &str, name: &str) -> bool {
        self.namespaces
            .get(namespace)
            .is_some_and(|entry| entry.deployments.contains_key(name))
    }

    /// The deployments of a namespace, in no particular order.
    ///
    /// Fails with [`MirrorError::NamespaceNotFound`] when the namespace is
    /// absent. Contrast with [`CacheState::replicas`], which does not
    /// validate.
    pub fn deployments(&self, namespace: &str) -> MirrorResult<Vec<ReplicaCount>> {
        let entry = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| MirrorError::NamespaceNotFound {
                name: namespace.to_string(),
            })?;
        Ok(collect_replicas(entry))
    }

    /// Every namespace that owns at least one deployment, with its
    /// deployments. Namespaces with zero deployments are omitted.
    ///
    /// Composite primitive: iterates namespaces and reuses
    /// [`CacheState::deployments`] on the same guard.
    pub fn namespaces_with_deployments(&self) -> Vec<NamespaceDeployments> {
        let mut out = Vec::new();
        for (name, entry) in &self.namespaces {
            if entry.deployments.is_empty() {
                continue;
            }
            // The namespace key exists by construction, so the primitive
            // cannot fail here.
            let deployments = match self.deployments(name) {
                Ok(list) => list,
                Err(_) => continue,
            };
            out.push(NamespaceDeployments {
                namespace: name.clone(),
                deployments,
            });
        }
        out
    }

    /// The last observed replica count of one deployment.
    ///
    /// Fails with [`MirrorError::NamespaceNotFound`] when the namespace is
    /// absent, and with [`MirrorError::DeploymentNotFound`] when the
    /// namespace exists but the deployment does not.
    pub fn replica_count(&self, namespace: &str, name: &str) -> MirrorResult<u32> {
        let entry = self
            .namespaces
            .get(namespace)
            .ok_or_else(|| MirrorError::NamespaceNotFound {
                name: namespace.to_string(),
            })?;
        entry
            .deployments
            .get(name)
            .copied()
            .ok_or_else(|| MirrorError::DeploymentNotFound {
                namespace: namespace.to_string(),
                name: name.to_string(),
            })
    }

    /// Replica counts for every deployment of a namespace.
    ///
    /// Does not validate namespace existence: an unknown namespace yields an
    /// empty list, not an error. Callers that need the NotFound distinction
    /// must pre-check with [`CacheState::namespace_exists`]. This asymmetry
    /// with [`CacheState::deployments`] is part of the contract.
    pub fn replicas(&self, namespace: &str) -> Vec<ReplicaCount> {
        self.namespaces
            .get(namespace)
            .map(collect_replicas)
            .unwrap_or_default()
    }
}

fn collect_replicas(entry: &NamespaceEntry) -> Vec<ReplicaCount> {
    entry
        .deployments
        .iter()
        .map(|(name, replicas)| ReplicaCount {
            name: name.clone(),
            replicas: *replicas,
        })
        .collect()
}

/// The mirror cache: [`CacheState`] behind a single exclusive lock.
///
/// Mutated exclusively by the synchronization engine, read by the query
/// surface. Hold durations are pure in-memory work; the guard is never held
/// across an await point.
#[derive(Debug, Default)]
pub struct MirrorCache {
    state: Mutex<CacheState>,
}

impl MirrorCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the cache-wide lock.
    ///
    /// Crate-internal: the synchronization engine applies each event inside
    /// one acquisition. Public readers go through the wrappers below.
    pub(crate) fn lock(&self) -> MutexGuard<'_, CacheState> {
        self.state.lock()
    }

    /// All namespace names, in no particular order.
    pub fn namespace_names(&self) -> Vec<String> {
        trace!("query: namespace names");
        self.state.lock().namespace_names()
    }

    /// Whether the namespace has an entry.
    pub fn namespace_exists(&self, namespace: &str) -> bool {
        self.state.lock().namespace_exists(namespace)
    }

    /// Whether the deployment has an entry; `false` when the namespace is
    /// absent.
    pub fn deployment_exists(&self, namespace: &str, name: &str) -> bool {
        self.state.lock().deployment_exists(namespace, name)
    }

    /// The deployments of a namespace; NotFound when the namespace is absent.
    pub fn deployments(&self, namespace: &str) -> MirrorResult<Vec<ReplicaCount>> {
        trace!(namespace, "query: deployments");
        self.state.lock().deployments(namespace)
    }

    /// Every non-empty namespace with its deployments, under one lock
    /// acquisition for the whole composite.
    pub fn namespaces_with_deployments(&self) -> Vec<NamespaceDeployments> {
        trace!("query: all namespaces with deployments");
        self.state.lock().namespaces_with_deployments()
    }

    /// The last observed replica count of one deployment, with distinct
    /// NotFound cases for namespace and deployment.
    pub fn replica_count(&self, namespace: &str, name: &str) -> MirrorResult<u32> {
        trace!(namespace, deployment = name, "query: replica count");
        self.state.lock().replica_count(namespace, name)
    }

    /// Replica counts for a namespace; empty (never an error) when the
    /// namespace is unknown.
    pub fn replicas(&self, namespace: &str) -> Vec<ReplicaCount> {
        trace!(namespace, "query: replicas");
        self.state.lock().replicas(namespace)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> MirrorCache {
        let cache = MirrorCache::new();
        {
            let mut state = cache.lock();
            state
                .namespaces
                .insert("team-a".into(), NamespaceEntry::default());
            state
                .namespaces
                .get_mut("team-a")
                .unwrap()
                .deployments
                .insert("web".into(), 3);
            state
                .namespaces
                .insert("team-b".into(), NamespaceEntry::default());
        }
        cache
    }

    #[test]
    fn namespace_primitives() {
        let cache = seeded();
        let mut names = cache.namespace_names();
        names.sort();
        assert_eq!(names, vec!["team-a", "team-b"]);
        assert!(cache.namespace_exists("team-a"));
        assert!(!cache.namespace_exists("team-c"));
    }

    #[test]
    fn deployment_exists_is_false_for_missing_namespace() {
        let cache = seeded();
        assert!(cache.deployment_exists("team-a", "web"));
        assert!(!cache.deployment_exists("team-a", "api"));
        assert!(!cache.deployment_exists("team-c", "web"));
    }

    #[test]
    fn deployments_validates_namespace() {
        let cache = seeded();
        let list = cache.deployments("team-a").unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].name, "web");
        assert_eq!(list[0].replicas, 3);

        // Empty namespace is fine; missing namespace is NotFound.
        assert!(cache.deployments("team-b").unwrap().is_empty());
        assert!(matches!(
            cache.deployments("team-c"),
            Err(MirrorError::NamespaceNotFound { .. })
        ));
    }

    #[test]
    fn replicas_does_not_validate_namespace() {
        // The asymmetry with `deployments`: unknown namespace yields an
        // empty list, not an error.
        let cache = seeded();
        assert_eq!(cache.replicas("team-a").len(), 1);
        assert!(cache.replicas("team-c").is_empty());
    }

    #[test]
    fn replica_count_distinguishes_absence_cases() {
        let cache = seeded();
        assert_eq!(cache.replica_count("team-a", "web").unwrap(), 3);
        assert!(matches!(
            cache.replica_count("team-c", "web"),
            Err(MirrorError::NamespaceNotFound { .. })
        ));
        assert!(matches!(
            cache.replica_count("team-a", "api"),
            Err(MirrorError::DeploymentNotFound { .. })
        ));
    }

    #[test]
    fn all_namespaces_omits_empty_ones() {
        let cache = seeded();
        let all = cache.namespaces_with_deployments();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].namespace, "team-a");
        assert_eq!(all[0].deployments.len(), 1);
    }

    #[test]
    fn results_are_independent_copies() {
        let cache = seeded();
        let mut list = cache.deployments("team-a").unwrap();
        list[0].replicas = 99;
        // Mutating the returned copy leaves the cache untouched.
        assert_eq!(cache.replica_count("team-a", "web").unwrap(), 3);
    }
}
