//! Error types for mirror operations.
//!
//! This module provides [`MirrorError`], the error type shared by the cache,
//! the synchronization engine, and the HTTP surface. Absence conditions keep
//! the namespace and deployment cases distinct so the transport boundary can
//! report which lookup failed.

use crate::resource::ResourceKind;

/// Error type covering all failure modes of the mirror.
///
/// Ignorable watch events (duplicate adds, dangling deletes, no-op updates)
/// are *not* errors: the synchronization engine logs and drops them without
/// surfacing anything. Everything here either reaches the HTTP boundary or
/// aborts startup.
#[derive(Debug, thiserror::Error)]
pub enum MirrorError {
    /// The named namespace has no entry in the cache.
    #[error("namespace not found: {name}")]
    NamespaceNotFound {
        /// The namespace that was looked up.
        name: String,
    },

    /// The namespace exists but the named deployment does not.
    #[error("deployment not found: {namespace}/{name}")]
    DeploymentNotFound {
        /// The owning namespace.
        namespace: String,
        /// The deployment that was looked up.
        name: String,
    },

    /// A control-plane client call failed. Opaque; propagated as-is.
    #[error("control-plane client error: {message}")]
    Client {
        /// Description of the failed call.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A watch stream ended before its initial sync completed.
    #[error("watch stream closed before initial sync: {kind}")]
    WatchClosed {
        /// The resource kind whose stream closed.
        kind: ResourceKind,
    },

    /// Response serialization failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Error message.
        message: String,
    },

    /// Invalid builder or server configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Unexpected internal error.
    #[error("internal error: {message}")]
    Internal {
        /// Error message.
        message: String,
        /// Optional underlying error.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl MirrorError {
    /// Create a client error from any error type.
    pub fn client<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Client {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create a client error with no underlying cause.
    pub fn client_msg(message: impl Into<String>) -> Self {
        Self::Client {
            message: message.into(),
            source: None,
        }
    }

    /// Create an internal error from any error type.
    pub fn internal<E>(message: impl Into<String>, source: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Internal {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Whether this error is one of the two absence conditions.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NamespaceNotFound { .. } | Self::DeploymentNotFound { .. }
        )
    }
}
