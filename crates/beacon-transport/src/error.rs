//! HTTP transport errors and their mapping onto protocol errors.

use std::time::Duration;

use beacon_core::{DirectoryError, PeerError};
use http::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connect to {address} failed: {source}")]
    Connect {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("invalid request: {0}")]
    Request(#[from] http::Error),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("server answered {status}: {message}")]
    Status { status: StatusCode, message: String },

    #[error("undecodable body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl TransportError {
    /// Whether the remote end was never reached or stopped answering.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            TransportError::Connect { .. } | TransportError::Http(_) | TransportError::Timeout(_)
        )
    }

    pub fn into_peer_error(self, name: &str) -> PeerError {
        let name = name.to_string();
        match self {
            TransportError::Timeout(after) => PeerError::Timeout { name, after },
            e if e.is_connectivity() => PeerError::Unreachable {
                name,
                reason: e.to_string(),
            },
            e => PeerError::Malformed {
                name,
                reason: e.to_string(),
            },
        }
    }

    pub fn into_directory_error(self) -> DirectoryError {
        match self {
            TransportError::Timeout(after) => DirectoryError::Timeout(after),
            e if e.is_connectivity() => DirectoryError::Unavailable(e.to_string()),
            e => DirectoryError::Malformed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refused() -> TransportError {
        TransportError::Connect {
            address: "127.0.0.1:1".to_string(),
            source: std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
        }
    }

    #[test]
    fn connect_failure_means_dead_peer() {
        let err = refused().into_peer_error("node-a");
        assert!(err.is_connectivity());
        assert!(matches!(err, PeerError::Unreachable { ref name, .. } if name == "node-a"));
    }

    #[test]
    fn timeout_keeps_duration() {
        let after = Duration::from_millis(500);
        assert_eq!(
            TransportError::Timeout(after).into_peer_error("node-a"),
            PeerError::Timeout {
                name: "node-a".to_string(),
                after
            }
        );
        assert_eq!(
            TransportError::Timeout(after).into_directory_error(),
            DirectoryError::Timeout(after)
        );
    }

    #[test]
    fn bad_status_is_malformed_not_dead() {
        let err = TransportError::Status {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: "boom".to_string(),
        };
        assert!(!err.is_connectivity());
        assert!(!err.into_peer_error("node-a").is_connectivity());
    }

    #[test]
    fn unreachable_directory_is_unavailable() {
        assert!(matches!(
            refused().into_directory_error(),
            DirectoryError::Unavailable(_)
        ));
    }
}
