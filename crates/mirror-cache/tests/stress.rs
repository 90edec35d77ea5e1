//! Race-stress coverage for the single-lock cache.
//!
//! Composite reads must complete while interleaved with single-item reads
//! and with event-handler mutations. A deadlock here would hang the test
//! harness, so completion itself is the property under test.

use std::sync::Arc;
use std::thread;

use mirror_cache::{MirrorCache, SyncEngine};
use mirror_core::{DeploymentRecord, NamespaceRecord, WatchEvent};

const NAMESPACES: usize = 8;
const ROUNDS: usize = 200;

fn ns_name(i: usize) -> String {
    format!("ns-{i}")
}

#[test]
fn composite_reads_complete_under_concurrent_mutation() {
    let cache = Arc::new(MirrorCache::new());
    let engine = Arc::new(SyncEngine::new(Arc::clone(&cache)));

    for i in 0..NAMESPACES {
        engine.apply_namespace_event(WatchEvent::Added(NamespaceRecord::new(ns_name(i))));
    }

    let mut handles = Vec::new();

    // Writer: churns deployments through add/update/delete cycles.
    {
        let engine = Arc::clone(&engine);
        handles.push(thread::spawn(move || {
            for round in 0..ROUNDS {
                for i in 0..NAMESPACES {
                    let namespace = ns_name(i);
                    engine.apply_deployment_event(WatchEvent::Added(DeploymentRecord::new(
                        &namespace, "web", 1,
                    )));
                    engine.apply_deployment_event(WatchEvent::Modified {
                        old: DeploymentRecord::new(&namespace, "web", 1),
                        new: DeploymentRecord::new(&namespace, "web", (round % 7) as u32 + 1),
                    });
                    engine.apply_deployment_event(WatchEvent::Deleted(DeploymentRecord::new(
                        &namespace,
                        "web",
                        0,
                    )));
                }
            }
        }));
    }

    // Composite readers: list-all while the writer churns.
    for _ in 0..2 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for _ in 0..ROUNDS {
                let all = cache.namespaces_with_deployments();
                // Empty namespaces never appear in the composite listing.
                for item in &all {
                    assert!(!item.deployments.is_empty());
                }
                let names = cache.namespace_names();
                assert_eq!(names.len(), NAMESPACES);
            }
        }));
    }

    // Single-item readers.
    for reader in 0..2 {
        let cache = Arc::clone(&cache);
        handles.push(thread::spawn(move || {
            for round in 0..ROUNDS {
                let namespace = ns_name((reader + round) % NAMESPACES);
                let _ = cache.deployment_exists(&namespace, "web");
                let _ = cache.replicas(&namespace);
                match cache.replica_count(&namespace, "web") {
                    Ok(count) => assert!(count >= 1),
                    Err(err) => assert!(err.is_not_found()),
                }
            }
        }));
    }

    for handle in handles {
        handle.join().expect("stress thread panicked");
    }

    // Writer leaves every namespace empty; composite listing agrees.
    assert!(cache.namespaces_with_deployments().is_empty());
    assert_eq!(cache.namespace_names().len(), NAMESPACES);
}
