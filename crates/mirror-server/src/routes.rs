//! Path dispatch for the query/mutate surface.
//!
//! The surface is a fixed grammar, not a tree of nested routers: every
//! request is matched against an ordered regex table reproducing the path
//! contracts exactly (optional trailing slash, lowercase-alphanumeric name
//! segments, digit replica segments, and the literal `ANY` selector).
//! Anything that falls through is `unknown url path`, so malformed requests
//! and genuinely unknown paths are deliberately conflated as 404.

use std::sync::{Arc, LazyLock};

use axum::extract::State;
use axum::http::{Method, Uri};
use axum::Router;
use regex::Regex;
use tracing::debug;

use mirror_cache::MirrorCache;
use mirror_core::ControlPlaneClient;

use crate::handlers::{self, Reply};

/// Shared state behind the HTTP surface.
pub(crate) struct AppState {
    /// The mirror, read-only from here.
    pub(crate) cache: Arc<MirrorCache>,
    /// Control-plane client for the mutation path.
    pub(crate) client: Arc<dyn ControlPlaneClient>,
}

/// The ordered path grammar.
///
/// `ANY` is uppercase by construction, so it can never collide with a
/// captured name segment (`[-a-z0-9]+`); the single-item patterns are still
/// checked first to match the dispatch order of the table.
mod paths {
    use super::*;

    fn re(pattern: &str) -> Regex {
        Regex::new(pattern).expect("static route pattern")
    }

    pub(super) static LIVEZ: LazyLock<Regex> = LazyLock::new(|| re(r"^/livez/?$"));
    pub(super) static READYZ: LazyLock<Regex> = LazyLock::new(|| re(r"^/readyz/?$"));
    pub(super) static NAMESPACES: LazyLock<Regex> = LazyLock::new(|| re(r"^/namespaces/?$"));
    pub(super) static ONE_DEPLOYMENTS: LazyLock<Regex> =
        LazyLock::new(|| re(r"^/namespaces/([-a-z0-9]+)/deployments/?$"));
    pub(super) static ALL_DEPLOYMENTS: LazyLock<Regex> =
        LazyLock::new(|| re(r"^/namespaces/ANY/deployments/?$"));
    pub(super) static ONE_REPLICAS: LazyLock<Regex> =
        LazyLock::new(|| re(r"^/namespaces/([-a-z0-9]+)/deployments/([-a-z0-9]+)/replica_count/?$"));
    pub(super) static ALL_REPLICAS: LazyLock<Regex> =
        LazyLock::new(|| re(r"^/namespaces/([-a-z0-9]+)/deployments/ANY/replica_count/?$"));
    pub(super) static SET_REPLICAS: LazyLock<Regex> = LazyLock::new(|| {
        re(r"^/namespaces/([-a-z0-9]+)/deployments/([-a-z0-9]+)/replica_count/(\d+)/?$")
    });
}

/// Build the router serving the query/mutate surface.
pub fn router(cache: Arc<MirrorCache>, client: Arc<dyn ControlPlaneClient>) -> Router {
    let state = Arc::new(AppState { cache, client });
    Router::new().fallback(dispatch).with_state(state)
}

async fn dispatch(State(state): State<Arc<AppState>>, method: Method, uri: Uri) -> Reply {
    route(&state, &method, uri.path()).await
}

/// Match one request against the grammar and run its handler.
pub(crate) async fn route(state: &AppState, method: &Method, path: &str) -> Reply {
    debug!(%method, path, "dispatch");
    let get = *method == Method::GET;

    if get && paths::LIVEZ.is_match(path) {
        return handlers::livez();
    }
    if get && paths::READYZ.is_match(path) {
        return handlers::readyz();
    }
    if get && paths::NAMESPACES.is_match(path) {
        return handlers::namespaces(state);
    }
    if get {
        if let Some(caps) = paths::ONE_DEPLOYMENTS.captures(path) {
            return handlers::deployments(state, &caps[1]);
        }
        if paths::ALL_DEPLOYMENTS.is_match(path) {
            return handlers::deployments_all(state);
        }
        if let Some(caps) = paths::ONE_REPLICAS.captures(path) {
            return handlers::replica_count(state, &caps[1], &caps[2]);
        }
        if let Some(caps) = paths::ALL_REPLICAS.captures(path) {
            return handlers::replica_count_all(state, &caps[1]);
        }
    }
    if get || *method == Method::PUT {
        if let Some(caps) = paths::SET_REPLICAS.captures(path) {
            // The digit class admits values beyond u32; treat overflow as a
            // malformed path.
            let Ok(replicas) = caps[3].parse::<u32>() else {
                return handlers::not_found("invalid arg(s)", path);
            };
            return handlers::replica_count_set(state, &caps[1], &caps[2], replicas).await;
        }
    }

    handlers::not_found("unknown url path", path)
}
