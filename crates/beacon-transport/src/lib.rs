//! beacon-transport — HTTP/JSON transport for beacon nodes.
//!
//! Serves a node's remote-callable operations and the shared directory as
//! axum routes, and implements `NodeRpc`, `Connector` and `Directory` on
//! top of plain hyper HTTP/1 clients.
//!
//! # Routes
//!
//! | Method | Path | Description |
//! |---|---|---|
//! | POST | `/rpc/election` | Become leader and broadcast |
//! | GET | `/rpc/leader` | Believed leader |
//! | POST | `/rpc/leader` | Adopt a leader |
//! | POST | `/rpc/heartbeat` | Follower heartbeat |
//! | GET | `/rpc/eligibility` | May this node lead |
//! | GET | `/status` | Node status snapshot |
//! | GET | `/names` | List bound names (directory) |
//! | GET | `/names/{name}` | Look up a name (directory) |
//! | PUT | `/names/{name}` | Bind a name (directory) |
//! | DELETE | `/names/{name}` | Unbind a name (directory) |

pub mod client;
pub mod error;
pub mod server;
pub mod wire;

pub use client::{HttpConnector, HttpDirectory, HttpPeer, fetch_status};
pub use error::TransportError;
pub use server::{directory_router, node_router};
