//! A participating node: its state, its collaborators, and the handlers
//! for calls arriving from peers.
//!
//! `Node` is cheap to clone; the scheduler and the transport server each
//! hold a clone and mutate the same `ClusterState`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use beacon_core::rpc::HEARTBEAT_ACK;
use beacon_core::{
    Connector, Directory, DirectoryError, DirectoryResult, HeartbeatReply, NodeIdentity, NodeRpc,
    NodeStatus, PeerError, PeerResult, ELECTION_TOKEN,
};
use tracing::{debug, info, warn};

use crate::error::ClusterError;
use crate::state::ClusterState;

struct NodeInner {
    state: ClusterState,
    directory: Arc<dyn Directory>,
    connector: Arc<dyn Connector>,
    rpc_timeout: Duration,
}

#[derive(Clone)]
pub struct Node {
    inner: Arc<NodeInner>,
}

impl Node {
    pub fn new(
        identity: NodeIdentity,
        directory: Arc<dyn Directory>,
        connector: Arc<dyn Connector>,
        rpc_timeout: Duration,
    ) -> Self {
        info!(
            name = %identity.name(),
            endpoint = %identity.endpoint(),
            eligible = identity.is_eligible(),
            "node prepared"
        );
        Self {
            inner: Arc::new(NodeInner {
                state: ClusterState::new(identity),
                directory,
                connector,
                rpc_timeout,
            }),
        }
    }

    pub fn identity(&self) -> &NodeIdentity {
        self.inner.state.identity()
    }

    pub fn name(&self) -> &str {
        self.identity().name()
    }

    pub fn state(&self) -> &ClusterState {
        &self.inner.state
    }

    pub fn rpc_timeout(&self) -> Duration {
        self.inner.rpc_timeout
    }

    pub async fn status(&self) -> NodeStatus {
        self.inner.state.snapshot().await
    }

    /// Bind this node's name to its endpoint in the directory.
    pub async fn register(&self) -> DirectoryResult<()> {
        let identity = self.identity();
        self.directory_op(self.inner.directory.bind(identity.name(), identity.endpoint()))
            .await?;
        info!(name = %identity.name(), "registered in directory");
        Ok(())
    }

    /// Bind our name again if it went missing, e.g. after a peer that
    /// timed out on us unbound it. Returns whether a new binding was made.
    pub async fn ensure_registered(&self) -> DirectoryResult<bool> {
        let bound = self
            .directory_op(self.inner.directory.lookup(self.name()))
            .await?;
        if bound.is_some() {
            return Ok(false);
        }
        match self.register().await {
            Ok(()) => {
                warn!(name = %self.name(), "name was missing from directory, registered again");
                Ok(true)
            }
            // Someone else bound it between lookup and bind.
            Err(DirectoryError::AlreadyBound(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove this node's binding, e.g. on graceful shutdown.
    pub async fn deregister(&self) -> DirectoryResult<bool> {
        self.directory_op(self.inner.directory.unbind(self.name())).await
    }

    /// Every registered name except our own.
    pub(crate) async fn registered_peers(&self) -> DirectoryResult<Vec<String>> {
        let mut names = self.directory_op(self.inner.directory.list()).await?;
        names.retain(|n| n != self.name());
        Ok(names)
    }

    /// Whether `name` is still bound. Directory failures count as bound so
    /// that an unavailable directory does not veto a reported leader.
    pub(crate) async fn is_registered(&self, name: &str) -> bool {
        !matches!(
            self.directory_op(self.inner.directory.lookup(name)).await,
            Ok(None)
        )
    }

    /// Look up `name`, connect, and run `call` against it, bounded by the
    /// RPC timeout.
    pub(crate) async fn call_peer<T, F, Fut>(&self, name: &str, call: F) -> Result<T, ClusterError>
    where
        F: FnOnce(Arc<dyn NodeRpc>) -> Fut,
        Fut: Future<Output = PeerResult<T>>,
    {
        self.call_peer_within(name, self.inner.rpc_timeout, call).await
    }

    /// Like `call_peer`, for calls that legitimately outlast one RPC
    /// timeout (an election answers only after its broadcast).
    pub(crate) async fn call_peer_within<T, F, Fut>(
        &self,
        name: &str,
        timeout: Duration,
        call: F,
    ) -> Result<T, ClusterError>
    where
        F: FnOnce(Arc<dyn NodeRpc>) -> Fut,
        Fut: Future<Output = PeerResult<T>>,
    {
        let endpoint = self
            .directory_op(self.inner.directory.lookup(name))
            .await?
            .ok_or_else(|| PeerError::NotRegistered {
                name: name.to_string(),
            })?;

        let peer = self.inner.connector.connect(name, &endpoint);
        match tokio::time::timeout(timeout, call(peer)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PeerError::Timeout {
                name: name.to_string(),
                after: timeout,
            }
            .into()),
        }
    }

    /// Record a failed peer call. A dead peer is removed from the directory.
    pub(crate) async fn note_failure(&self, err: ClusterError, errors: &mut Vec<ClusterError>) {
        if let Some(peer) = err.dead_peer() {
            warn!(%peer, error = %err, "peer not reachable");
            self.forget_peer(peer).await;
        } else {
            warn!(error = %err, "peer call failed");
        }
        errors.push(err);
    }

    /// Unbind a dead peer. An already-absent name is not an error.
    pub(crate) async fn forget_peer(&self, name: &str) {
        match self.directory_op(self.inner.directory.unbind(name)).await {
            Ok(true) => info!(peer = %name, "removed from directory"),
            Ok(false) => debug!(peer = %name, "already absent from directory"),
            Err(e) => warn!(peer = %name, error = %e, "failed to remove from directory"),
        }
    }

    async fn directory_op<T>(&self, op: impl Future<Output = DirectoryResult<T>>) -> DirectoryResult<T> {
        let timeout = self.inner.rpc_timeout;
        match tokio::time::timeout(timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(DirectoryError::Timeout(timeout)),
        }
    }
}

/// Inbound calls from peers.
#[async_trait]
impl NodeRpc for Node {
    async fn start_election(&self, candidate: &str) -> PeerResult<String> {
        match self.run_election(candidate).await {
            Ok(_) => Ok(ELECTION_TOKEN.to_string()),
            Err(e) => {
                // Leadership was claimed locally but not announced; an empty
                // token tells the caller to keep looking.
                warn!(%candidate, error = %e, "election broadcast failed");
                Ok(String::new())
            }
        }
    }

    async fn get_leader(&self) -> PeerResult<Option<String>> {
        Ok(self.inner.state.leader().await)
    }

    async fn adopt_leader(&self, leader: &str) -> PeerResult<()> {
        debug!(%leader, "leader announced");
        self.inner.state.set_leader(Some(leader.to_string())).await;
        Ok(())
    }

    async fn receive_heartbeat(&self, sender: &str, message: &str) -> PeerResult<HeartbeatReply> {
        match self.inner.state.record_follower(sender).await {
            Ok(()) => {
                debug!(%sender, %message, "heartbeat received");
                Ok(HeartbeatReply::Ack {
                    message: HEARTBEAT_ACK.to_string(),
                })
            }
            Err(leader) => {
                debug!(%sender, leader = ?leader, "heartbeat rejected, not leader");
                Ok(HeartbeatReply::Rejection { leader })
            }
        }
    }

    async fn get_eligibility(&self) -> PeerResult<bool> {
        Ok(self.identity().is_eligible())
    }
}
