//! Endpoint handlers for the query/mutate surface.
//!
//! Each handler maps cache absence conditions to a structured 404 and any
//! control-plane failure on the mutation path to a structured 500. Malformed
//! paths never reach these functions; the dispatcher reports them as
//! `unknown url path`.

use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::{error, warn};

use mirror_core::MirrorError;

use crate::routes::AppState;
use crate::scale;

/// A finished response: status plus an optional JSON body.
///
/// Every reply carries the JSON content type, including the empty-bodied
/// health and scale responses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reply {
    pub(crate) status: StatusCode,
    pub(crate) body: Option<String>,
}

impl Reply {
    fn ok_empty() -> Self {
        Self {
            status: StatusCode::OK,
            body: None,
        }
    }

    /// Serialize `body` as the reply payload. A serialization failure is an
    /// internal error with its own structured body.
    fn json<T: Serialize>(status: StatusCode, body: &T) -> Self {
        match serde_json::to_string(body) {
            Ok(body) => Self {
                status,
                body: Some(body),
            },
            Err(err) => {
                error!(error = %err, "response serialization failed");
                internal_error(
                    "serialization",
                    &MirrorError::Serialization {
                        message: err.to_string(),
                    },
                )
            }
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        (
            self.status,
            [(header::CONTENT_TYPE, "application/json")],
            self.body.unwrap_or_default(),
        )
            .into_response()
    }
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    message: &'a str,
    element: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct NamespacesBody {
    namespaces: Vec<String>,
}

#[derive(Serialize)]
struct NamespaceDeploymentsBody {
    namespace: String,
    deployments: Vec<String>,
}

#[derive(Serialize)]
struct ReplicaBody {
    namespace: String,
    deployment: String,
    replica_count: u32,
}

#[derive(Serialize)]
struct ReplicaEntryBody {
    deployment: String,
    replica_count: u32,
}

#[derive(Serialize)]
struct NamespaceReplicasBody {
    namespace: String,
    deployments: Vec<ReplicaEntryBody>,
}

/// 404 with the structured `{"message","element"}` body.
pub(crate) fn not_found(message: &str, element: &str) -> Reply {
    warn!(message, element, "request rejected");
    Reply::json(
        StatusCode::NOT_FOUND,
        &ErrorBody {
            message,
            element,
            error: None,
        },
    )
}

/// 500 with the structured `{"message","element","error"}` body.
pub(crate) fn internal_error(element: &str, err: &MirrorError) -> Reply {
    error!(element, error = %err, "request failed");
    Reply::json(
        StatusCode::INTERNAL_SERVER_ERROR,
        &ErrorBody {
            message: "func call returned error",
            element,
            error: Some(format!("{err:?}")),
        },
    )
}

/// GET /livez
pub(crate) fn livez() -> Reply {
    Reply::ok_empty()
}

/// GET /readyz
///
/// Unconditional: startup does not serve until initial sync completes, and
/// the probe itself performs no further check.
pub(crate) fn readyz() -> Reply {
    Reply::ok_empty()
}

/// GET /namespaces
pub(crate) fn namespaces(state: &AppState) -> Reply {
    Reply::json(
        StatusCode::OK,
        &NamespacesBody {
            namespaces: state.cache.namespace_names(),
        },
    )
}

/// GET /namespaces/{ns}/deployments
pub(crate) fn deployments(state: &AppState, namespace: &str) -> Reply {
    match state.cache.deployments(namespace) {
        Ok(list) => Reply::json(
            StatusCode::OK,
            &NamespaceDeploymentsBody {
                namespace: namespace.to_string(),
                deployments: list.into_iter().map(|d| d.name).collect(),
            },
        ),
        Err(MirrorError::NamespaceNotFound { .. }) => not_found("namespace not found", namespace),
        Err(err) => internal_error("deployments", &err),
    }
}

/// GET /namespaces/ANY/deployments
pub(crate) fn deployments_all(state: &AppState) -> Reply {
    let body: Vec<NamespaceDeploymentsBody> = state
        .cache
        .namespaces_with_deployments()
        .into_iter()
        .map(|item| NamespaceDeploymentsBody {
            namespace: item.namespace,
            deployments: item.deployments.into_iter().map(|d| d.name).collect(),
        })
        .collect();
    Reply::json(StatusCode::OK, &body)
}

/// GET /namespaces/{ns}/deployments/{d}/replica_count
pub(crate) fn replica_count(state: &AppState, namespace: &str, deployment: &str) -> Reply {
    match state.cache.replica_count(namespace, deployment) {
        Ok(count) => Reply::json(
            StatusCode::OK,
            &ReplicaBody {
                namespace: namespace.to_string(),
                deployment: deployment.to_string(),
                replica_count: count,
            },
        ),
        Err(MirrorError::NamespaceNotFound { .. }) => not_found("namespace not found", namespace),
        Err(MirrorError::DeploymentNotFound { .. }) => {
            not_found("deployment not found", &format!("{namespace}/{deployment}"))
        }
        Err(err) => internal_error("replica_count", &err),
    }
}

/// GET /namespaces/{ns}/deployments/ANY/replica_count
///
/// The listing primitive does not validate namespace existence, so the
/// NotFound distinction is made here with an explicit pre-check.
pub(crate) fn replica_count_all(state: &AppState, namespace: &str) -> Reply {
    if !state.cache.namespace_exists(namespace) {
        return not_found("namespace not found", namespace);
    }
    let deployments = state
        .cache
        .replicas(namespace)
        .into_iter()
        .map(|d| ReplicaEntryBody {
            deployment: d.name,
            replica_count: d.replicas,
        })
        .collect();
    Reply::json(
        StatusCode::OK,
        &NamespaceReplicasBody {
            namespace: namespace.to_string(),
            deployments,
        },
    )
}

/// GET or PUT /namespaces/{ns}/deployments/{d}/replica_count/{n}
///
/// Existence is checked against the cache before the write-through; the
/// cache itself is not updated here. The new count becomes visible only
/// when the resulting update notification is processed.
pub(crate) async fn replica_count_set(
    state: &AppState,
    namespace: &str,
    deployment: &str,
    replicas: u32,
) -> Reply {
    if !state.cache.namespace_exists(namespace) {
        return not_found("namespace not found", namespace);
    }
    if !state.cache.deployment_exists(namespace, deployment) {
        return not_found("deployment not found", &format!("{namespace}/{deployment}"));
    }
    match scale::set_replicas(state.client.as_ref(), namespace, deployment, replicas).await {
        Ok(()) => Reply::ok_empty(),
        Err(err) => internal_error("set_replicas", &err),
    }
}
