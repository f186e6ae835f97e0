//! Errors surfaced by a scheduler tick.

use beacon_core::{DirectoryError, PeerError};
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ClusterError {
    #[error(transparent)]
    Peer(#[from] PeerError),

    #[error(transparent)]
    Directory(#[from] DirectoryError),
}

impl ClusterError {
    /// The peer name if this failure means that peer is dead.
    pub fn dead_peer(&self) -> Option<&str> {
        match self {
            ClusterError::Peer(e) if e.is_connectivity() => Some(e.peer()),
            _ => None,
        }
    }
}
