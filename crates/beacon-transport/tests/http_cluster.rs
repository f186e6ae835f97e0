//! End-to-end tests over real sockets.
//!
//! A directory server and several node servers run on ephemeral ports in
//! this process; nodes find each other only through `HttpDirectory` and
//! talk only through `HttpConnector`.

use std::sync::Arc;
use std::time::Duration;

use beacon_cluster::{ElectionOutcome, HeartbeatOutcome, Node};
use beacon_core::{Directory, DirectoryError, MemoryDirectory, NodeIdentity, Role};
use beacon_transport::{
    HttpConnector, HttpDirectory, directory_router, fetch_status, node_router,
};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const TIMEOUT: Duration = Duration::from_millis(500);

async fn serve(router: axum::Router) -> (String, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    (address, handle)
}

async fn start_directory() -> String {
    let directory: Arc<dyn Directory> = Arc::new(MemoryDirectory::new());
    serve(directory_router(directory)).await.0
}

async fn start_node(name: &str, eligible: bool, directory: &str) -> (Node, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = listener.local_addr().unwrap().to_string();
    let node = Node::new(
        NodeIdentity::new(name, endpoint, eligible),
        Arc::new(HttpDirectory::new(directory, TIMEOUT)),
        Arc::new(HttpConnector::new(TIMEOUT)),
        TIMEOUT,
    );
    let router = node_router(node.clone());
    let handle = tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    node.register().await.unwrap();
    (node, handle)
}

#[tokio::test]
async fn directory_over_http() {
    let address = start_directory().await;
    let dir = HttpDirectory::new(address, TIMEOUT);

    dir.bind("node-b", "127.0.0.1:7102").await.unwrap();
    dir.bind("node-a", "127.0.0.1:7101").await.unwrap();
    assert_eq!(
        dir.bind("node-a", "127.0.0.1:9999").await.unwrap_err(),
        DirectoryError::AlreadyBound("node-a".to_string())
    );

    assert_eq!(dir.list().await.unwrap(), vec!["node-a", "node-b"]);
    assert_eq!(
        dir.lookup("node-a").await.unwrap().as_deref(),
        Some("127.0.0.1:7101")
    );
    assert!(dir.lookup("node-z").await.unwrap().is_none());

    assert!(dir.unbind("node-a").await.unwrap());
    assert!(!dir.unbind("node-a").await.unwrap());
}

#[tokio::test]
async fn unreachable_directory_is_unavailable() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let err = HttpDirectory::new(address, TIMEOUT).list().await.unwrap_err();
    assert!(matches!(err, DirectoryError::Unavailable(_)));
}

#[tokio::test]
async fn election_and_heartbeat_over_http() {
    let directory = start_directory().await;
    let (a, _a) = start_node("node-a", true, &directory).await;
    let (b, _b) = start_node("node-b", false, &directory).await;

    let round = a.discover_or_elect().await.unwrap();
    assert_eq!(round.outcome, ElectionOutcome::ElectedSelf);
    assert_eq!(b.state().leader().await.as_deref(), Some("node-a"));

    let outcome = b.send_heartbeat().await.unwrap();
    assert_eq!(
        outcome,
        HeartbeatOutcome::Acked {
            leader: "node-a".to_string()
        }
    );
    assert_eq!(a.state().followers().await, vec!["node-b"]);

    let status = fetch_status(a.identity().endpoint(), TIMEOUT).await.unwrap();
    assert_eq!(status.role, Role::Leader);
    assert_eq!(status.followers, vec!["node-b"]);
}

#[tokio::test]
async fn dead_leader_is_detected_over_http() {
    let directory = start_directory().await;
    let (a, _a) = start_node("node-a", true, &directory).await;
    let (b, b_server) = start_node("node-b", true, &directory).await;

    // a asks the eligible b to lead.
    let round = a.discover_or_elect().await.unwrap();
    assert_eq!(
        round.outcome,
        ElectionOutcome::ElectedPeer {
            leader: "node-b".to_string()
        }
    );
    assert_eq!(b.state().role().await, Role::Leader);

    b_server.abort();
    let _ = b_server.await;

    let outcome = a.send_heartbeat().await.unwrap();
    assert!(matches!(outcome, HeartbeatOutcome::LeaderLost { .. }));
    assert_eq!(a.state().role().await, Role::Seeking);

    let dir = HttpDirectory::new(directory, TIMEOUT);
    assert!(dir.lookup("node-b").await.unwrap().is_none());
}
