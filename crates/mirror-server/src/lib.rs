//! # mirror-server
//!
//! HTTP query/mutate surface and scale write-through path for kubemirror.
//!
//! This crate wires the pieces together:
//!
//! - [`MirrorServer`] - subscribes the watches, runs the synchronization
//!   engine, and serves the HTTP surface
//! - [`MirrorServerBuilder`] - builder for configuring the server
//! - [`router`] - the standalone axum router, for embedding the surface in
//!   an existing server
//! - [`set_replicas`] - the write-through mutation path
//! - Graceful shutdown via [`ShutdownController`]
//!
//! ## Consistency
//!
//! Queries answer from the cache, which trails the control plane by event
//! delivery latency. The scale path writes to the control plane directly and
//! never touches the cache, so a successful scale is not immediately visible
//! through the query endpoints. Both properties are by contract.
//!
//! ## Example
//!
//! ```rust,ignore
//! use mirror_server::MirrorServer;
//! use std::sync::Arc;
//!
//! let server = MirrorServer::builder()
//!     .client(Arc::new(client))
//!     .build()?;
//!
//! server.serve("0.0.0.0:8088".parse()?).await?;
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod builder;
mod config;
mod handlers;
mod routes;
mod scale;
mod shutdown;

pub use builder::MirrorServerBuilder;
pub use config::ServerConfig;
pub use routes::router;
pub use scale::set_replicas;
pub use shutdown::ShutdownController;

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::info;

use mirror_cache::{MirrorCache, SyncEngine, SyncHandle};
use mirror_core::{ControlPlaneClient, MirrorError, MirrorResult};

/// The mirror server.
///
/// Owns the cache, the control-plane client, and the shutdown controller.
/// [`MirrorServer::serve`] performs the full startup sequence: subscribe
/// both watches, wait for initial synchronization (fatal on failure), then
/// serve the HTTP surface until shutdown.
pub struct MirrorServer {
    pub(crate) cache: Arc<MirrorCache>,
    pub(crate) client: Arc<dyn ControlPlaneClient>,
    pub(crate) config: ServerConfig,
    pub(crate) shutdown: ShutdownController,
}

impl std::fmt::Debug for MirrorServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorServer")
            .field("config", &self.config)
            .finish()
    }
}

impl MirrorServer {
    /// Create a builder.
    pub fn builder() -> MirrorServerBuilder {
        MirrorServerBuilder::new()
    }

    /// The shared cache.
    pub fn cache(&self) -> &Arc<MirrorCache> {
        &self.cache
    }

    /// The server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// The shutdown controller, for triggering shutdown programmatically.
    pub fn shutdown(&self) -> &ShutdownController {
        &self.shutdown
    }

    /// Subscribe both watch streams, spawn the synchronization engine, and
    /// wait for the initial sync to complete.
    ///
    /// A stream that closes before delivering its initial-sync marker is a
    /// fatal startup failure; there is no retry at this layer.
    pub async fn start_sync(&self) -> MirrorResult<SyncHandle> {
        let namespaces = self.client.watch_namespaces(self.config.event_buffer).await?;
        let deployments = self
            .client
            .watch_deployments(self.config.event_buffer)
            .await?;

        let engine = SyncEngine::new(Arc::clone(&self.cache));
        let mut handle = engine.spawn(namespaces, deployments);
        handle.wait_synced().await?;
        info!("initial cache synchronization complete");
        Ok(handle)
    }

    /// Run the server: sync, then serve HTTP until shutdown.
    pub async fn serve(&self, addr: SocketAddr) -> MirrorResult<()> {
        let _sync = self.start_sync().await?;

        let app = router(Arc::clone(&self.cache), Arc::clone(&self.client));
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|err| MirrorError::internal("failed to bind listener", err))?;
        info!(%addr, "serving query/mutate surface");

        self.shutdown.spawn_signal_listener();
        let mut shutdown_rx = self.shutdown.subscribe();
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            })
            .await
            .map_err(|err| MirrorError::internal("server error", err))
    }
}
