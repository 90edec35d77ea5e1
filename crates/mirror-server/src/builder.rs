//! Server builder.

use std::sync::Arc;

use mirror_cache::MirrorCache;
use mirror_core::{ControlPlaneClient, MirrorError, MirrorResult};

use crate::config::ServerConfig;
use crate::shutdown::ShutdownController;
use crate::MirrorServer;

/// Builder for creating a [`MirrorServer`].
///
/// # Example
///
/// ```rust,ignore
/// use mirror_server::MirrorServer;
/// use std::sync::Arc;
///
/// let server = MirrorServer::builder()
///     .client(Arc::new(my_control_plane_client))
///     .event_buffer(128)
///     .build()?;
/// ```
#[derive(Default)]
pub struct MirrorServerBuilder {
    client: Option<Arc<dyn ControlPlaneClient>>,
    cache: Option<Arc<MirrorCache>>,
    event_buffer: Option<usize>,
}

impl std::fmt::Debug for MirrorServerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MirrorServerBuilder")
            .field("has_client", &self.client.is_some())
            .field("has_cache", &self.cache.is_some())
            .field("event_buffer", &self.event_buffer)
            .finish()
    }
}

impl MirrorServerBuilder {
    /// Create a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the control-plane client.
    ///
    /// This is required.
    pub fn client(mut self, client: Arc<dyn ControlPlaneClient>) -> Self {
        self.client = Some(client);
        self
    }

    /// Use an existing cache instead of a fresh empty one.
    pub fn cache(mut self, cache: Arc<MirrorCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Set the per-kind watch channel bound.
    pub fn event_buffer(mut self, buffer: usize) -> Self {
        self.event_buffer = Some(buffer);
        self
    }

    /// Build the server.
    ///
    /// # Errors
    ///
    /// Returns an error if no client was provided or the event buffer is
    /// zero.
    pub fn build(self) -> MirrorResult<MirrorServer> {
        let client = self
            .client
            .ok_or_else(|| MirrorError::Configuration("control-plane client is required".into()))?;

        let config = ServerConfig {
            event_buffer: self.event_buffer.unwrap_or_else(|| ServerConfig::default().event_buffer),
        };
        if config.event_buffer == 0 {
            return Err(MirrorError::Configuration(
                "event buffer must be non-zero".into(),
            ));
        }

        Ok(MirrorServer {
            cache: self.cache.unwrap_or_default(),
            client,
            config,
            shutdown: ShutdownController::new(),
        })
    }
}
