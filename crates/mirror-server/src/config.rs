//! Server configuration.

/// Configuration for the mirror server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bound of each per-kind watch delivery channel.
    pub event_buffer: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { event_buffer: 64 }
    }
}
