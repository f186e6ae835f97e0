//! Role and status types reported by a node.

use serde::{Deserialize, Serialize};

/// Where a node stands in the election protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Leader unknown; discovery runs on the next tick.
    Seeking,
    /// Following a leader that is not this node.
    Follower,
    /// This node believes it is the leader.
    Leader,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::Seeking => write!(f, "seeking"),
            Role::Follower => write!(f, "follower"),
            Role::Leader => write!(f, "leader"),
        }
    }
}

/// Point-in-time view of a node, served on `/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub name: String,
    pub endpoint: String,
    pub eligible: bool,
    pub role: Role,
    pub leader: Option<String>,
    /// Followers that heartbeated this node (only populated while leader).
    pub followers: Vec<String>,
    /// Whether the leader acknowledged a heartbeat during the current tick.
    pub leader_acked: bool,
}
