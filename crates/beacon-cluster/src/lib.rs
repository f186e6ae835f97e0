//! beacon-cluster — leader election among peer nodes.
//!
//! Keeps a single elected leader among a set of nodes that talk over
//! unreliable remote calls. Followers heartbeat the leader, the leader
//! probes its followers, and a node that knows no leader runs discovery
//! and, failing that, elects one.
//!
//! # Architecture
//!
//! ```text
//! Scheduler (one tick per interval)
//!   ├── 1. Membership sweep    (leader)   → prune unreachable followers
//!   ├── 2. Heartbeat           (follower) → ack / redirect / leader lost
//!   └── 3. Discover or elect   (no leader known)
//!
//! Node (shared by the scheduler and inbound calls)
//!   ├── ClusterState: believed leader, followers, ack flag (one mutex)
//!   ├── Directory:    bind / unbind / lookup / list
//!   └── Connector:    name + endpoint → NodeRpc
//! ```
//!
//! Agreement is eventual: two nodes electing at the same moment can leave
//! peers following different leaders until the losing leader dies or a
//! later broadcast reaches them. There is no epoch and no step-down.

pub mod election;
pub mod error;
pub mod heartbeat;
pub mod local;
pub mod membership;
pub mod node;
pub mod scheduler;
pub mod state;

pub use election::{ElectionOutcome, ElectionRound};
pub use error::ClusterError;
pub use heartbeat::HeartbeatOutcome;
pub use local::LocalNetwork;
pub use membership::Sweep;
pub use node::Node;
pub use scheduler::{Scheduler, TickReport};
pub use state::ClusterState;
