//! # kubemirror
//!
//! Eventually-consistent mirror of a control plane's namespace/deployment
//! state, with an HTTP query/mutate surface.
//!
//! A background watch per resource kind drives cache mutation while
//! foreground requests read the same structure under one exclusive lock.
//! Scaling writes through to the control plane directly; the cache reflects
//! the result only once the corresponding update event arrives.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kubemirror::prelude::*;
//! use std::sync::Arc;
//!
//! let server = MirrorServer::builder()
//!     .client(Arc::new(my_control_plane_client))
//!     .build()?;
//!
//! server.serve("0.0.0.0:8088".parse()?).await?;
//! ```
//!
//! ## Architecture
//!
//! This library is organized into several crates:
//!
//! - `mirror-core` - records, events, errors, and the client trait
//! - `mirror-cache` - single-lock cache and synchronization engine
//! - `mirror-server` - HTTP surface and scale write-through
//!
//! This crate (`kubemirror`) re-exports all public APIs for convenience.
//!
//! ## Design Principles
//!
//! 1. **One lock, two layers** - read primitives live on the guarded state,
//!    so composite queries can never nest lock acquisition
//! 2. **Dropped events are not errors** - duplicates, dangling references,
//!    and no-ops are the expected races of an eventually-consistent feed
//! 3. **The cache mirrors observations only** - the mutation path never
//!    updates it directly

#![deny(unsafe_code)]
#![warn(missing_docs)]

// Re-export all sub-crates
pub use mirror_cache as cache;
pub use mirror_core as core;
pub use mirror_server as server;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use kubemirror::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use mirror_core::{
        ControlPlaneClient, DeploymentRecord, EventReceiver, EventSender, MirrorError,
        MirrorResult, NamespaceRecord, ResourceKind, Scale, WatchEvent,
    };

    // Cache types
    pub use mirror_cache::{
        MirrorCache, NamespaceDeployments, ReplicaCount, SyncEngine, SyncHandle, SyncStats,
    };

    // Server types
    pub use mirror_server::{
        router, set_replicas, MirrorServer, MirrorServerBuilder, ServerConfig, ShutdownController,
    };
}

/// Version information for this crate.
pub mod version {
    /// Crate version.
    pub const VERSION: &str = env!("CARGO_PKG_VERSION");

    /// Get version info as a string.
    pub fn version_string() -> String {
        format!("kubemirror {VERSION}")
    }
}

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use std::sync::Arc;

    #[test]
    fn prelude_imports_work() {
        let cache = Arc::new(MirrorCache::new());
        let engine = SyncEngine::new(Arc::clone(&cache));
        engine.apply_namespace_event(WatchEvent::Added(NamespaceRecord::new("team-a")));
        assert!(cache.namespace_exists("team-a"));
    }

    #[test]
    fn version_info() {
        assert!(super::version::version_string().contains("kubemirror"));
    }
}
