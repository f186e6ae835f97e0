//! The remote-callable contract every node exposes.
//!
//! `NodeRpc` is implemented twice: by the local node (inbound handling) and
//! by transport clients that forward each call to a remote node. The
//! protocol only ever talks to peers through `Arc<dyn NodeRpc>` handed out
//! by a `Connector`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::PeerResult;

/// Token returned by a completed `start_election`.
pub const ELECTION_TOKEN: &str = "leader election done";

/// Acknowledgement text returned by a leader for a heartbeat.
pub const HEARTBEAT_ACK: &str = "message received";

/// Answer to a heartbeat.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum HeartbeatReply {
    /// The callee is leader and recorded the sender as a follower.
    Ack { message: String },
    /// The callee is not leader; `leader` is whom it follows, if anyone.
    Rejection { leader: Option<String> },
}

/// Operations a node serves to its peers.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Make the callee leader and have it broadcast the adoption.
    async fn start_election(&self, candidate: &str) -> PeerResult<String>;

    /// The callee's believed leader, if any.
    async fn get_leader(&self) -> PeerResult<Option<String>>;

    /// Set the callee's believed leader.
    async fn adopt_leader(&self, leader: &str) -> PeerResult<()>;

    /// Deliver a heartbeat from `sender`.
    async fn receive_heartbeat(&self, sender: &str, message: &str) -> PeerResult<HeartbeatReply>;

    /// Whether the callee may become leader.
    async fn get_eligibility(&self) -> PeerResult<bool>;
}

/// Turns a directory entry into a callable peer.
///
/// Connecting is cheap and never fails: reachability is only known once a
/// call is made.
pub trait Connector: Send + Sync {
    fn connect(&self, name: &str, endpoint: &str) -> Arc<dyn NodeRpc>;
}
