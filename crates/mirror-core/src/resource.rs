//! Resource records mirrored from the control plane.
//!
//! These are the wire-agnostic shapes delivered by watch notifications and
//! used by the scale read/write path. A deployment is characterized here
//! solely by its owning namespace, its name, and its desired replica count.

use serde::{Deserialize, Serialize};

/// The two resource kinds the mirror watches.
///
/// Watch streams are independent per kind; no ordering is guaranteed between
/// them (a deployment event may arrive before its namespace's add).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A namespace scope.
    Namespace,
    /// A deployment workload.
    Deployment,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Namespace => f.write_str("namespace"),
            Self::Deployment => f.write_str("deployment"),
        }
    }
}

/// A namespace as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRecord {
    /// Unique namespace name.
    pub name: String,
}

impl NamespaceRecord {
    /// Create a namespace record.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// A deployment as reported by the control plane.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeploymentRecord {
    /// Owning namespace name.
    pub namespace: String,
    /// Deployment name, unique within its namespace.
    pub name: String,
    /// Desired replica count last reported by the control plane.
    pub replicas: u32,
}

impl DeploymentRecord {
    /// Create a deployment record.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>, replicas: u32) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
            replicas,
        }
    }
}

/// The scale representation used to read and write a deployment's desired
/// replica count on the authoritative source.
///
/// The resource version token is opaque to the mirror: it is read from the
/// control plane and carried through unchanged on the write. The mirror does
/// no conflict detection with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    /// Desired replica count.
    pub replicas: u32,
    /// Opaque version token from the read, if the control plane supplies one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_version: Option<String>,
}

impl Scale {
    /// Create a scale representation with no version token.
    pub fn new(replicas: u32) -> Self {
        Self {
            replicas,
            resource_version: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_display() {
        assert_eq!(ResourceKind::Namespace.to_string(), "namespace");
        assert_eq!(ResourceKind::Deployment.to_string(), "deployment");
    }

    #[test]
    fn scale_round_trips_version_token() {
        let scale = Scale {
            replicas: 4,
            resource_version: Some("12345".into()),
        };
        let json = serde_json::to_string(&scale).unwrap();
        let back: Scale = serde_json::from_str(&json).unwrap();
        assert_eq!(back, scale);
    }

    #[test]
    fn scale_omits_missing_version_token() {
        let json = serde_json::to_string(&Scale::new(2)).unwrap();
        assert!(!json.contains("resource_version"));
    }
}
