//! axum routes serving a node's RPCs and the directory.

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use beacon_cluster::Node;
use beacon_core::{Directory, DirectoryError, NodeRpc, PeerError};
use tracing::warn;

use crate::wire::*;

/// Routes for one node.
///
/// | Method | Path | Operation |
/// |---|---|---|
/// | POST | `/rpc/election` | `start_election` |
/// | GET | `/rpc/leader` | `get_leader` |
/// | POST | `/rpc/leader` | `adopt_leader` |
/// | POST | `/rpc/heartbeat` | `receive_heartbeat` |
/// | GET | `/rpc/eligibility` | `get_eligibility` |
/// | GET | `/status` | node status snapshot |
pub fn node_router(node: Node) -> Router {
    Router::new()
        .route("/rpc/election", post(start_election))
        .route("/rpc/leader", get(get_leader).post(adopt_leader))
        .route("/rpc/heartbeat", post(receive_heartbeat))
        .route("/rpc/eligibility", get(get_eligibility))
        .route("/status", get(status))
        .with_state(node)
}

/// Routes for a shared directory.
pub fn directory_router(directory: Arc<dyn Directory>) -> Router {
    Router::new()
        .route("/names", get(list_names))
        .route(
            "/names/{name}",
            get(lookup_name).put(bind_name).delete(unbind_name),
        )
        .with_state(directory)
}

fn peer_failure(e: PeerError) -> Response {
    warn!(error = %e, "rpc handler failed");
    error_response(&e.to_string(), StatusCode::INTERNAL_SERVER_ERROR)
}

fn directory_failure(e: DirectoryError) -> Response {
    match e {
        DirectoryError::AlreadyBound(_) => error_response(&e.to_string(), StatusCode::CONFLICT),
        e => error_response(&e.to_string(), StatusCode::SERVICE_UNAVAILABLE),
    }
}

// ── Node RPCs ──────────────────────────────────────────────────

/// POST /rpc/election
pub async fn start_election(
    State(node): State<Node>,
    Json(req): Json<ElectionRequest>,
) -> Response {
    match node.start_election(&req.candidate).await {
        Ok(token) => ApiResponse::ok(ElectionResponse { token }).into_response(),
        Err(e) => peer_failure(e),
    }
}

/// GET /rpc/leader
pub async fn get_leader(State(node): State<Node>) -> Response {
    match node.get_leader().await {
        Ok(leader) => ApiResponse::ok(LeaderBody { leader }).into_response(),
        Err(e) => peer_failure(e),
    }
}

/// POST /rpc/leader
pub async fn adopt_leader(State(node): State<Node>, Json(req): Json<LeaderBody>) -> Response {
    let Some(leader) = req.leader.filter(|l| !l.is_empty()) else {
        return error_response("leader name required", StatusCode::BAD_REQUEST);
    };
    match node.adopt_leader(&leader).await {
        Ok(()) => ApiResponse::ok(LeaderBody {
            leader: Some(leader),
        })
        .into_response(),
        Err(e) => peer_failure(e),
    }
}

/// POST /rpc/heartbeat
pub async fn receive_heartbeat(
    State(node): State<Node>,
    Json(req): Json<HeartbeatRequest>,
) -> Response {
    match node.receive_heartbeat(&req.sender, &req.message).await {
        Ok(reply) => ApiResponse::ok(reply).into_response(),
        Err(e) => peer_failure(e),
    }
}

/// GET /rpc/eligibility
pub async fn get_eligibility(State(node): State<Node>) -> Response {
    match node.get_eligibility().await {
        Ok(eligible) => ApiResponse::ok(EligibilityResponse { eligible }).into_response(),
        Err(e) => peer_failure(e),
    }
}

/// GET /status
pub async fn status(State(node): State<Node>) -> impl IntoResponse {
    ApiResponse::ok(node.status().await)
}

// ── Directory ──────────────────────────────────────────────────

/// GET /names
pub async fn list_names(State(directory): State<Arc<dyn Directory>>) -> Response {
    match directory.list().await {
        Ok(names) => ApiResponse::ok(NamesResponse { names }).into_response(),
        Err(e) => directory_failure(e),
    }
}

/// GET /names/{name}
pub async fn lookup_name(
    State(directory): State<Arc<dyn Directory>>,
    Path(name): Path<String>,
) -> Response {
    match directory.lookup(&name).await {
        Ok(Some(endpoint)) => ApiResponse::ok(Binding { name, endpoint }).into_response(),
        Ok(None) => error_response("name not bound", StatusCode::NOT_FOUND),
        Err(e) => directory_failure(e),
    }
}

/// PUT /names/{name}
pub async fn bind_name(
    State(directory): State<Arc<dyn Directory>>,
    Path(name): Path<String>,
    Json(req): Json<BindRequest>,
) -> Response {
    match directory.bind(&name, &req.endpoint).await {
        Ok(()) => (
            StatusCode::CREATED,
            ApiResponse::ok(Binding {
                name,
                endpoint: req.endpoint,
            }),
        )
            .into_response(),
        Err(e) => directory_failure(e),
    }
}

/// DELETE /names/{name}
pub async fn unbind_name(
    State(directory): State<Arc<dyn Directory>>,
    Path(name): Path<String>,
) -> Response {
    match directory.unbind(&name).await {
        Ok(removed) => ApiResponse::ok(UnbindResponse { removed }).into_response(),
        Err(e) => directory_failure(e),
    }
}
