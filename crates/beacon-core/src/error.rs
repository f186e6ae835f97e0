//! Error types shared by the protocol and its transports.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for remote calls to a peer node.
pub type PeerResult<T> = Result<T, PeerError>;

/// Result type alias for directory operations.
pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// Failure of a remote call to a named peer.
///
/// Connectivity failures (`NotRegistered`, `Unreachable`, `Timeout`) mean
/// "the peer is dead" to the protocol. `Malformed` means the peer answered
/// with something unexpected and is reported, not treated as a death.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PeerError {
    #[error("peer {name} is not registered in the directory")]
    NotRegistered { name: String },

    #[error("peer {name} is unreachable: {reason}")]
    Unreachable { name: String, reason: String },

    #[error("peer {name} did not answer within {after:?}")]
    Timeout { name: String, after: Duration },

    #[error("peer {name} sent a malformed response: {reason}")]
    Malformed { name: String, reason: String },
}

impl PeerError {
    /// Whether this failure means the peer should be considered dead.
    pub fn is_connectivity(&self) -> bool {
        !matches!(self, PeerError::Malformed { .. })
    }

    /// Name of the peer the failed call was addressed to.
    pub fn peer(&self) -> &str {
        match self {
            PeerError::NotRegistered { name }
            | PeerError::Unreachable { name, .. }
            | PeerError::Timeout { name, .. }
            | PeerError::Malformed { name, .. } => name,
        }
    }
}

/// Failure of a directory (naming service) operation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("directory unavailable: {0}")]
    Unavailable(String),

    #[error("directory did not answer within {0:?}")]
    Timeout(Duration),

    #[error("name already bound: {0}")]
    AlreadyBound(String),

    #[error("malformed directory response: {0}")]
    Malformed(String),
}

/// Errors that can occur while loading `beacon.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid duration for {field}: {value:?}")]
    InvalidDuration { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("invalid node name {0:?}: use letters, digits, '-', '_' or '.'")]
    InvalidName(String),
}
