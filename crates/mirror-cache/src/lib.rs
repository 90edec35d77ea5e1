//! # mirror-cache
//!
//! Single-lock namespace/deployment cache and synchronization engine.
//!
//! This crate maintains the in-memory mirror of control-plane state:
//!
//! - [`MirrorCache`] - the nested namespace → deployment → replica map
//!   behind one exclusive lock, with copy-out read wrappers
//! - [`CacheState`] - lock-free read primitives on the already-held guard,
//!   for composing queries without nested lock acquisition
//! - [`SyncEngine`] - applies per-kind watch events to the cache, dropping
//!   the expected races of an eventually-consistent feed
//! - [`SyncStats`] - atomic applied/dropped counters per resource kind
//!
//! ## Key Design Decisions
//!
//! - One exclusive lock covers the whole nested map; there is no
//!   per-namespace locking
//! - Read primitives live on the guarded state so a composite query can
//!   never re-acquire the lock it already holds
//! - The guard is never held across an await point
//! - The cache reflects only *observed* control-plane state; the scale
//!   write-through path does not touch it
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use mirror_cache::{MirrorCache, SyncEngine};
//! use mirror_core::{NamespaceRecord, WatchEvent};
//!
//! let cache = Arc::new(MirrorCache::new());
//! let engine = SyncEngine::new(Arc::clone(&cache));
//!
//! engine.apply_namespace_event(WatchEvent::Added(NamespaceRecord::new("team-a")));
//! assert!(cache.namespace_exists("team-a"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod stats;
mod store;
mod sync;

pub use stats::SyncStats;
pub use store::{CacheState, MirrorCache, NamespaceDeployments, ReplicaCount};
pub use sync::{SyncEngine, SyncHandle, SyncState};
