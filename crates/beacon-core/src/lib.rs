//! beacon-core — shared vocabulary for the Beacon leader election layer.
//!
//! Everything the election protocol consumes from the outside world is
//! defined here as a narrow interface, so that the protocol crate can be
//! driven by a real transport or by in-memory fakes.
//!
//! # Modules
//!
//! - **`identity`** — immutable `NodeIdentity` and name generation
//! - **`rpc`** — the `NodeRpc` wire contract and the `Connector` that
//!   resolves a registered endpoint into a callable peer
//! - **`directory`** — the `Directory` naming service contract and the
//!   in-memory `MemoryDirectory`
//! - **`types`** — `Role` and the `NodeStatus` snapshot
//! - **`config`** — `beacon.toml` parsing and duration strings
//! - **`error`** — peer, directory, and config errors

pub mod config;
pub mod directory;
pub mod error;
pub mod identity;
pub mod rpc;
pub mod types;

pub use config::{BeaconConfig, Timing};
pub use directory::{Directory, MemoryDirectory};
pub use error::{ConfigError, DirectoryError, DirectoryResult, PeerError, PeerResult};
pub use identity::{Eligibility, NodeIdentity};
pub use rpc::{Connector, HeartbeatReply, NodeRpc, ELECTION_TOKEN, HEARTBEAT_ACK};
pub use types::{NodeStatus, Role};
