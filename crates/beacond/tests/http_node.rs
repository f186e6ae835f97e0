//! Router-level regression tests for the daemon's HTTP surface.
//!
//! Requests go straight into the axum routers with `oneshot`; peers of the
//! node under test live on a `LocalNetwork`.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use beacon_cluster::{LocalNetwork, Node};
use beacon_core::{Directory, MemoryDirectory, NodeIdentity, NodeStatus, Role};
use beacon_transport::wire::ApiResponse;
use beacon_transport::{directory_router, node_router};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use tower::ServiceExt;

async fn test_node(
    name: &str,
    eligible: bool,
    dir: &MemoryDirectory,
    net: &LocalNetwork,
) -> Node {
    let node = Node::new(
        NodeIdentity::new(name, format!("{name}:1"), eligible),
        Arc::new(dir.clone()),
        Arc::new(net.clone()),
        Duration::from_millis(200),
    );
    net.attach(&node).await;
    node.register().await.unwrap();
    node
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_vec(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn read_data<T: DeserializeOwned>(resp: axum::response::Response) -> T {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    let parsed: ApiResponse<T> = serde_json::from_slice(&bytes).unwrap();
    assert!(parsed.success);
    parsed.data.unwrap()
}

#[tokio::test]
async fn fresh_node_reports_no_leader() {
    let dir = MemoryDirectory::new();
    let net = LocalNetwork::new();
    let a = test_node("node-a", true, &dir, &net).await;

    let resp = node_router(a).oneshot(get("/rpc/leader")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = read_data(resp).await;
    assert_eq!(body, serde_json::json!({ "leader": null }));
}

#[tokio::test]
async fn election_route_broadcasts_to_peers() {
    let dir = MemoryDirectory::new();
    let net = LocalNetwork::new();
    let a = test_node("node-a", true, &dir, &net).await;
    let b = test_node("node-b", false, &dir, &net).await;
    let router = node_router(a.clone());

    let resp = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/rpc/election",
            serde_json::json!({ "candidate": "node-b" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: serde_json::Value = read_data(resp).await;
    assert_eq!(body["token"], "leader election done");

    assert_eq!(a.state().role().await, Role::Leader);
    assert_eq!(b.state().leader().await.as_deref(), Some("node-a"));
}

#[tokio::test]
async fn heartbeat_route_acks_or_redirects() {
    let dir = MemoryDirectory::new();
    let net = LocalNetwork::new();
    let a = test_node("node-a", true, &dir, &net).await;
    let router = node_router(a.clone());
    let heartbeat = || {
        json_request(
            "POST",
            "/rpc/heartbeat",
            serde_json::json!({ "sender": "node-b", "message": "heartbeat from node-b" }),
        )
    };

    // Not leader yet: rejection with no redirect target.
    let resp = router.clone().oneshot(heartbeat()).await.unwrap();
    let body: serde_json::Value = read_data(resp).await;
    assert_eq!(body, serde_json::json!({ "kind": "rejection", "leader": null }));

    a.state().become_leader().await;
    let resp = router.oneshot(heartbeat()).await.unwrap();
    let body: serde_json::Value = read_data(resp).await;
    assert_eq!(
        body,
        serde_json::json!({ "kind": "ack", "message": "message received" })
    );
    assert_eq!(a.state().followers().await, vec!["node-b"]);
}

#[tokio::test]
async fn adopt_route_sets_leader_and_status_reflects_it() {
    let dir = MemoryDirectory::new();
    let net = LocalNetwork::new();
    let a = test_node("node-a", false, &dir, &net).await;
    let router = node_router(a);

    let resp = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/rpc/leader",
            serde_json::json!({ "leader": "node-z" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = router.clone().oneshot(get("/status")).await.unwrap();
    let status: NodeStatus = read_data(resp).await;
    assert_eq!(status.name, "node-a");
    assert!(!status.eligible);
    assert_eq!(status.role, Role::Follower);
    assert_eq!(status.leader.as_deref(), Some("node-z"));

    let resp = router.oneshot(get("/rpc/eligibility")).await.unwrap();
    let body: serde_json::Value = read_data(resp).await;
    assert_eq!(body, serde_json::json!({ "eligible": false }));
}

#[tokio::test]
async fn malformed_rpc_body_is_client_error() {
    let dir = MemoryDirectory::new();
    let net = LocalNetwork::new();
    let a = test_node("node-a", true, &dir, &net).await;

    let resp = node_router(a.clone())
        .oneshot(json_request(
            "POST",
            "/rpc/heartbeat",
            serde_json::json!({ "who": "node-b" }),
        ))
        .await
        .unwrap();
    assert!(resp.status().is_client_error());
    assert!(a.state().followers().await.is_empty());
}

#[tokio::test]
async fn directory_routes() {
    let dir = MemoryDirectory::new();
    let router = directory_router(Arc::new(dir.clone()));

    let resp = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/names/node-a",
            serde_json::json!({ "endpoint": "127.0.0.1:7101" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = router
        .clone()
        .oneshot(json_request(
            "PUT",
            "/names/node-a",
            serde_json::json!({ "endpoint": "127.0.0.1:7999" }),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let resp = router.clone().oneshot(get("/names/node-a")).await.unwrap();
    let body: serde_json::Value = read_data(resp).await;
    assert_eq!(body["endpoint"], "127.0.0.1:7101");

    let resp = router.clone().oneshot(get("/names")).await.unwrap();
    let body: serde_json::Value = read_data(resp).await;
    assert_eq!(body, serde_json::json!({ "names": ["node-a"] }));

    let delete = || {
        Request::builder()
            .method("DELETE")
            .uri("/names/node-a")
            .body(Body::empty())
            .unwrap()
    };
    let resp = router.clone().oneshot(delete()).await.unwrap();
    let body: serde_json::Value = read_data(resp).await;
    assert_eq!(body["removed"], true);

    let resp = router.clone().oneshot(delete()).await.unwrap();
    let body: serde_json::Value = read_data(resp).await;
    assert_eq!(body["removed"], false);

    let resp = router.oneshot(get("/names/node-a")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    assert!(dir.is_empty().await);
}

#[tokio::test]
async fn directory_router_serves_shared_bindings() {
    let dir = MemoryDirectory::new();
    dir.bind("node-b", "127.0.0.1:7102").await.unwrap();

    let resp = directory_router(Arc::new(dir))
        .oneshot(get("/names/node-b"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}
