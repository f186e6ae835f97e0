//! In-process transport.
//!
//! `LocalNetwork` routes calls straight to `Node` values attached to it,
//! keyed by endpoint. Endpoints can be taken down and brought back to
//! simulate crashed processes, or slowed down to simulate an overloaded
//! one, without real sockets.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::{Connector, HeartbeatReply, NodeRpc, PeerError, PeerResult};
use tokio::sync::RwLock;
use tracing::debug;

use crate::node::Node;

#[derive(Default)]
struct Endpoints {
    nodes: HashMap<String, Node>,
    down: HashSet<String>,
    latency: HashMap<String, Duration>,
}

/// Shared in-memory network. Clones route through the same endpoints.
#[derive(Clone, Default)]
pub struct LocalNetwork {
    endpoints: Arc<RwLock<Endpoints>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `node` reachable at its endpoint.
    pub async fn attach(&self, node: &Node) {
        let endpoint = node.identity().endpoint().to_string();
        let mut endpoints = self.endpoints.write().await;
        endpoints.down.remove(&endpoint);
        endpoints.nodes.insert(endpoint, node.clone());
    }

    /// Simulate a crash: every call to `endpoint` fails as unreachable.
    pub async fn kill(&self, endpoint: &str) {
        self.endpoints.write().await.down.insert(endpoint.to_string());
        debug!(%endpoint, "endpoint down");
    }

    pub async fn revive(&self, endpoint: &str) {
        self.endpoints.write().await.down.remove(endpoint);
        debug!(%endpoint, "endpoint up");
    }

    /// Answer every call to `endpoint` only after `latency`.
    pub async fn delay(&self, endpoint: &str, latency: Duration) {
        let mut endpoints = self.endpoints.write().await;
        if latency.is_zero() {
            endpoints.latency.remove(endpoint);
        } else {
            endpoints.latency.insert(endpoint.to_string(), latency);
        }
        debug!(%endpoint, ?latency, "endpoint latency set");
    }

    pub async fn is_up(&self, endpoint: &str) -> bool {
        let endpoints = self.endpoints.read().await;
        endpoints.nodes.contains_key(endpoint) && !endpoints.down.contains(endpoint)
    }
}

impl Connector for LocalNetwork {
    fn connect(&self, name: &str, endpoint: &str) -> Arc<dyn NodeRpc> {
        Arc::new(LocalPeer {
            network: self.clone(),
            name: name.to_string(),
            endpoint: endpoint.to_string(),
        })
    }
}

struct LocalPeer {
    network: LocalNetwork,
    name: String,
    endpoint: String,
}

impl LocalPeer {
    async fn target(&self) -> PeerResult<Node> {
        let (node, latency) = {
            let endpoints = self.network.endpoints.read().await;
            if endpoints.down.contains(&self.endpoint) {
                return Err(self.unreachable("connection refused"));
            }
            let node = endpoints
                .nodes
                .get(&self.endpoint)
                .cloned()
                .ok_or_else(|| self.unreachable("no such endpoint"))?;
            (node, endpoints.latency.get(&self.endpoint).copied())
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(node)
    }

    fn unreachable(&self, reason: &str) -> PeerError {
        PeerError::Unreachable {
            name: self.name.clone(),
            reason: format!("{} ({reason})", self.endpoint),
        }
    }
}

#[async_trait]
impl NodeRpc for LocalPeer {
    async fn start_election(&self, candidate: &str) -> PeerResult<String> {
        self.target().await?.start_election(candidate).await
    }

    async fn get_leader(&self) -> PeerResult<Option<String>> {
        self.target().await?.get_leader().await
    }

    async fn adopt_leader(&self, leader: &str) -> PeerResult<()> {
        self.target().await?.adopt_leader(leader).await
    }

    async fn receive_heartbeat(&self, sender: &str, message: &str) -> PeerResult<HeartbeatReply> {
        self.target().await?.receive_heartbeat(sender, message).await
    }

    async fn get_eligibility(&self) -> PeerResult<bool> {
        self.target().await?.get_eligibility().await
    }
}
