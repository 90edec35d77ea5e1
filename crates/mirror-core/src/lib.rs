//! # mirror-core
//!
//! Core types, traits, and error handling for kubemirror.
//!
//! This crate provides the foundational pieces shared by the cache and
//! server crates:
//!
//! - [`MirrorError`] - error taxonomy with distinct absence conditions
//! - [`NamespaceRecord`] / [`DeploymentRecord`] - mirrored resource records
//! - [`Scale`] - the read/write scale representation
//! - [`WatchEvent`] - per-kind watch notifications with an initial-sync marker
//! - [`ControlPlaneClient`] - the external collaborator seam
//!
//! ## Example
//!
//! ```rust
//! use mirror_core::{DeploymentRecord, WatchEvent};
//!
//! let event = WatchEvent::Added(DeploymentRecord::new("team-a", "web", 3));
//! assert!(!event.is_sync_marker());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod event;
mod resource;

pub use client::ControlPlaneClient;
pub use error::MirrorError;
pub use event::{EventReceiver, EventSender, WatchEvent};
pub use resource::{DeploymentRecord, NamespaceRecord, ResourceKind, Scale};

/// Result type alias using [`MirrorError`].
pub type MirrorResult<T> = std::result::Result<T, MirrorError>;
